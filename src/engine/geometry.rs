//! Display geometry lookup via whichever X11 introspection tool is installed.
//!
//! Every provider is best-effort: a missing tool or unparseable output yields
//! `None`, never an error. Callers decide whether a fallback exists.

use std::process::{Command, Stdio};

use crate::engine::core::{MonitorInfo, ScreenSize};

/// Source of virtual-screen and primary-monitor geometry
pub trait GeometryProvider {
    fn name(&self) -> &'static str;

    fn screen_size(&self) -> Option<ScreenSize>;

    /// Providers without multi-monitor metadata return `None`
    fn primary_monitor(&self) -> Option<MonitorInfo>;
}

/// Run a tool and return its stdout when it exits successfully
pub(crate) fn run_tool(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).to_string()),
        Ok(out) => {
            tracing::debug!("{} exited with {}", program, out.status);
            None
        }
        Err(e) => {
            tracing::debug!("{} unavailable: {}", program, e);
            None
        }
    }
}

/// Parse "WxH+X+Y" as printed by xrandr
fn parse_geometry_token(token: &str) -> Option<(u32, u32, u32, u32)> {
    let (size, rest) = token.split_once('+')?;
    let (x, y) = rest.split_once('+')?;
    let (w, h) = size.split_once('x')?;
    Some((
        w.parse().ok()?,
        h.parse().ok()?,
        x.parse().ok()?,
        y.parse().ok()?,
    ))
}

/// Extract "current W x H" from the `Screen 0:` line of `xrandr --query`
pub fn parse_xrandr_screen(output: &str) -> Option<ScreenSize> {
    let line = output.lines().find(|l| l.starts_with("Screen "))?;
    let current = line.split(',').find_map(|part| part.trim().strip_prefix("current "))?;
    let (w, h) = current.split_once(" x ")?;
    Some(ScreenSize {
        w: w.trim().parse().ok()?,
        h: h.trim().parse().ok()?,
    })
}

/// Find the primary output in `xrandr --query`, or the first connected output
/// with geometry when none is flagged primary
pub fn parse_xrandr_primary(output: &str) -> Option<MonitorInfo> {
    let mut fallback = None;

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 || tokens[1] != "connected" {
            continue;
        }
        let is_primary = tokens[2] == "primary";
        let geometry = tokens[2..].iter().find_map(|t| parse_geometry_token(t));

        if let Some((w, h, x, y)) = geometry {
            let monitor = MonitorInfo {
                x,
                y,
                w,
                h,
                name: tokens[0].to_string(),
            };
            if is_primary {
                return Some(monitor);
            }
            if fallback.is_none() {
                fallback = Some(monitor);
            }
        }
    }

    fallback
}

/// Extract `dimensions:    WxH pixels` from xdpyinfo
pub fn parse_xdpyinfo_dimensions(output: &str) -> Option<ScreenSize> {
    let line = output
        .lines()
        .find_map(|l| l.trim().strip_prefix("dimensions:"))?;
    let size = line.split_whitespace().next()?;
    let (w, h) = size.split_once('x')?;
    Some(ScreenSize {
        w: w.parse().ok()?,
        h: h.parse().ok()?,
    })
}

/// Extract root window `Width:` and `Height:` from `xwininfo -root`
pub fn parse_xwininfo_root(output: &str) -> Option<ScreenSize> {
    let field = |name: &str| -> Option<u32> {
        output
            .lines()
            .find_map(|l| l.trim().strip_prefix(name))
            .and_then(|v| v.trim().parse().ok())
    };
    Some(ScreenSize {
        w: field("Width:")?,
        h: field("Height:")?,
    })
}

pub struct XrandrProvider;

impl GeometryProvider for XrandrProvider {
    fn name(&self) -> &'static str {
        "xrandr"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        run_tool("xrandr", &["--query"]).and_then(|out| parse_xrandr_screen(&out))
    }

    fn primary_monitor(&self) -> Option<MonitorInfo> {
        run_tool("xrandr", &["--query"]).and_then(|out| parse_xrandr_primary(&out))
    }
}

pub struct XdpyinfoProvider;

impl GeometryProvider for XdpyinfoProvider {
    fn name(&self) -> &'static str {
        "xdpyinfo"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        run_tool("xdpyinfo", &[]).and_then(|out| parse_xdpyinfo_dimensions(&out))
    }

    fn primary_monitor(&self) -> Option<MonitorInfo> {
        None
    }
}

pub struct XwininfoRootProvider;

impl GeometryProvider for XwininfoRootProvider {
    fn name(&self) -> &'static str {
        "xwininfo"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        run_tool("xwininfo", &["-root"]).and_then(|out| parse_xwininfo_root(&out))
    }

    fn primary_monitor(&self) -> Option<MonitorInfo> {
        None
    }
}

/// Providers queried in priority order; the first success wins
pub struct GeometryChain {
    providers: Vec<Box<dyn GeometryProvider>>,
}

impl GeometryChain {
    pub fn new(providers: Vec<Box<dyn GeometryProvider>>) -> Self {
        Self { providers }
    }

    /// xrandr, then xdpyinfo, then xwininfo
    pub fn system() -> Self {
        Self::new(vec![
            Box::new(XrandrProvider),
            Box::new(XdpyinfoProvider),
            Box::new(XwininfoRootProvider),
        ])
    }

    pub fn screen_size(&self) -> Option<ScreenSize> {
        self.providers.iter().find_map(|p| {
            let size = p.screen_size();
            match size {
                Some(s) => tracing::debug!("screen {}x{} from {}", s.w, s.h, p.name()),
                None => tracing::debug!("{} reported no screen size", p.name()),
            }
            size
        })
    }

    /// Primary monitor, or the whole virtual screen when no provider
    /// exposes monitor metadata
    pub fn primary_monitor(&self) -> Option<MonitorInfo> {
        if let Some(monitor) = self.providers.iter().find_map(|p| p.primary_monitor()) {
            return Some(monitor);
        }
        self.screen_size().map(MonitorInfo::whole_screen)
    }
}
