//! Capture rectangle resolution for every [`CaptureMode`].
//!
//! The geometry math lives in pure functions (`fixed_rect`, `crop_rect`,
//! `clamp_window`, ...) so it can be tested without a display. Interactive
//! selection goes through the [`RegionPicker`] trait.

use std::process::{Command, Stdio};
use thiserror::Error;

use crate::engine::core::{
    CaptureMode, MAX_CAPTURE_HEIGHT, MAX_CAPTURE_WIDTH, MIN_CAPTURE_DIM, MonitorInfo, RawRect,
    Rectangle, ScreenSize,
};
use crate::engine::geometry::GeometryChain;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("Could not determine screen geometry (tried xrandr, xdpyinfo, xwininfo)")]
    GeometryUnavailable,

    /// Operator dismissed the selection; a normal exit, not a failure
    #[error("Selection cancelled")]
    SelectionCancelled,

    #[error("Unexpected output from {tool}: {output:?}")]
    InvalidToolOutput { tool: &'static str, output: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: &'static str, message: String },

    #[error("Window at {x},{y} ({w}x{h}) lies outside the {screen_w}x{screen_h} screen")]
    WindowOffScreen {
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        screen_w: u32,
        screen_h: u32,
    },

    #[error(
        "Requested size {w}x{h} is out of range (minimum {min}x{min}, maximum {max_w}x{max_h})",
        min = MIN_CAPTURE_DIM,
        max_w = MAX_CAPTURE_WIDTH,
        max_h = MAX_CAPTURE_HEIGHT
    )]
    OutOfRange { w: u32, h: u32 },

    #[error("Requested size {w}x{h} exceeds monitor {monitor} ({monitor_w}x{monitor_h})")]
    ResolutionExceedsMonitor {
        w: u32,
        h: u32,
        monitor: String,
        monitor_w: u32,
        monitor_h: u32,
    },

    #[error(
        "Crop too aggressive: {axis} margins sum to {margin_sum}px on a {available}px monitor, leaving less than {min}px",
        min = MIN_CAPTURE_DIM
    )]
    CropTooAggressive {
        axis: &'static str,
        margin_sum: u64,
        available: u32,
    },

    #[error("Invalid capture geometry {0}: width and height must be even and at least 16")]
    InvalidGeometry(Rectangle),
}

/// Interactive selection tools
pub trait RegionPicker {
    /// Drag-select a rectangle. `Ok(None)` means the operator cancelled.
    fn select_region(&self) -> Result<Option<RawRect>, RegionError>;

    /// Click a window and report its frame geometry, unclamped
    fn pick_window(&self) -> Result<RawRect, RegionError>;
}

fn run_interactive(tool: &'static str, args: &[&str]) -> Result<(bool, String), RegionError> {
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| RegionError::ToolFailed {
            tool,
            message: e.to_string(),
        })?;
    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
    ))
}

/// slop for drag selection, xwininfo for window clicks
pub struct X11Picker;

impl RegionPicker for X11Picker {
    fn select_region(&self) -> Result<Option<RawRect>, RegionError> {
        // slop exits non-zero with empty output when the selection is dismissed
        let (_ok, stdout) = run_interactive("slop", &["-f", "%x %y %w %h"])?;
        parse_slop_output(&stdout)
    }

    fn pick_window(&self) -> Result<RawRect, RegionError> {
        // -frame reports the window-manager frame, decorations included
        let (ok, stdout) = run_interactive("xwininfo", &["-frame"])?;
        if !ok {
            return Err(RegionError::ToolFailed {
                tool: "xwininfo",
                message: "window selection failed".to_string(),
            });
        }
        parse_xwininfo_window(&stdout)
    }
}

/// Parse slop's "%x %y %w %h" output; empty output is a cancellation
pub fn parse_slop_output(output: &str) -> Result<Option<RawRect>, RegionError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let invalid = || RegionError::InvalidToolOutput {
        tool: "slop",
        output: trimmed.to_string(),
    };

    let values: Vec<i64> = trimmed
        .split_whitespace()
        .map(|v| v.parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;

    match values.as_slice() {
        [x, y, w, h] => Ok(Some(RawRect::new(*x, *y, *w, *h))),
        _ => Err(invalid()),
    }
}

/// Parse window geometry from `xwininfo` output
pub fn parse_xwininfo_window(output: &str) -> Result<RawRect, RegionError> {
    let field = |name: &str| -> Option<i64> {
        output
            .lines()
            .find_map(|l| l.trim().strip_prefix(name))
            .and_then(|v| v.trim().parse().ok())
    };

    match (
        field("Absolute upper-left X:"),
        field("Absolute upper-left Y:"),
        field("Width:"),
        field("Height:"),
    ) {
        (Some(x), Some(y), Some(w), Some(h)) => Ok(RawRect::new(x, y, w, h)),
        _ => Err(RegionError::InvalidToolOutput {
            tool: "xwininfo",
            output: output.trim().to_string(),
        }),
    }
}

/// Central post-condition check applied after every mode
pub fn validate_rectangle(rect: Rectangle) -> Result<Rectangle, RegionError> {
    if rect.is_encodable() {
        Ok(rect)
    } else {
        Err(RegionError::InvalidGeometry(rect))
    }
}

pub fn fullscreen_rect(screen: ScreenSize) -> Rectangle {
    Rectangle::new(0, 0, screen.w, screen.h).even()
}

/// Convert a drag selection into a capture rectangle
pub fn selection_rect(raw: RawRect) -> Rectangle {
    Rectangle::new(
        raw.x.max(0) as u32,
        raw.y.max(0) as u32,
        raw.w.clamp(0, u32::MAX as i64) as u32,
        raw.h.clamp(0, u32::MAX as i64) as u32,
    )
    .even()
}

/// Clip one axis to [0, limit). Returns (origin, size).
fn clamp_axis(origin: i64, size: i64, limit: i64) -> (i64, i64) {
    let (mut origin, mut size) = (origin, size);
    if origin < 0 {
        size = size.saturating_add(origin);
        origin = 0;
    }
    if origin.saturating_add(size) > limit {
        size = limit - origin;
    }
    (origin, size)
}

/// Clip a window rectangle to the virtual screen. Rectangles already on
/// screen come back unchanged.
pub fn clamp_window(raw: RawRect, screen: ScreenSize) -> Result<Rectangle, RegionError> {
    let (x, w) = clamp_axis(raw.x, raw.w, screen.w as i64);
    let (y, h) = clamp_axis(raw.y, raw.h, screen.h as i64);

    if w < 1 || h < 1 {
        return Err(RegionError::WindowOffScreen {
            x: raw.x,
            y: raw.y,
            w: raw.w,
            h: raw.h,
            screen_w: screen.w,
            screen_h: screen.h,
        });
    }

    Ok(Rectangle::new(x as u32, y as u32, w as u32, h as u32))
}

/// Best-effort window rectangle when no screen size is known:
/// negative origins are floored to 0, the size is kept as reported
pub fn floor_window_origin(raw: RawRect) -> Rectangle {
    Rectangle::new(
        raw.x.max(0) as u32,
        raw.y.max(0) as u32,
        raw.w.clamp(0, u32::MAX as i64) as u32,
        raw.h.clamp(0, u32::MAX as i64) as u32,
    )
}

/// Center a fixed-size rectangle on the primary monitor
pub fn fixed_rect(w: u32, h: u32, monitor: &MonitorInfo) -> Result<Rectangle, RegionError> {
    if !(MIN_CAPTURE_DIM..=MAX_CAPTURE_WIDTH).contains(&w)
        || !(MIN_CAPTURE_DIM..=MAX_CAPTURE_HEIGHT).contains(&h)
    {
        return Err(RegionError::OutOfRange { w, h });
    }

    let rect = Rectangle::new(0, 0, w, h).even();
    if rect.w > monitor.w || rect.h > monitor.h {
        return Err(RegionError::ResolutionExceedsMonitor {
            w: rect.w,
            h: rect.h,
            monitor: monitor.name.clone(),
            monitor_w: monitor.w,
            monitor_h: monitor.h,
        });
    }

    Ok(Rectangle {
        x: monitor.x + (monitor.w - rect.w) / 2,
        y: monitor.y + (monitor.h - rect.h) / 2,
        ..rect
    })
}

/// Shrink the primary monitor by the given margins
pub fn crop_rect(
    left: u32,
    right: u32,
    top: u32,
    bottom: u32,
    monitor: &MonitorInfo,
) -> Result<Rectangle, RegionError> {
    let width = remaining(left, right, monitor.w).ok_or(RegionError::CropTooAggressive {
        axis: "horizontal",
        margin_sum: left as u64 + right as u64,
        available: monitor.w,
    })?;
    let height = remaining(top, bottom, monitor.h).ok_or(RegionError::CropTooAggressive {
        axis: "vertical",
        margin_sum: top as u64 + bottom as u64,
        available: monitor.h,
    })?;

    // Even rounding happens after the subtraction so the left/top crop edge stays put
    Ok(Rectangle::new(monitor.x + left, monitor.y + top, width, height).even())
}

/// Size left after removing two margins, if at least the minimum remains
fn remaining(a: u32, b: u32, total: u32) -> Option<u32> {
    let margins = a as u64 + b as u64;
    let left = (total as u64).checked_sub(margins)?;
    if left < MIN_CAPTURE_DIM as u64 {
        return None;
    }
    Some(left as u32)
}

/// Resolves a [`CaptureMode`] against live geometry and interactive tools
pub struct RegionResolver<'a> {
    geometry: &'a GeometryChain,
    picker: &'a dyn RegionPicker,
}

impl<'a> RegionResolver<'a> {
    pub fn new(geometry: &'a GeometryChain, picker: &'a dyn RegionPicker) -> Self {
        Self { geometry, picker }
    }

    pub fn resolve(&self, mode: &CaptureMode) -> Result<Rectangle, RegionError> {
        let rect = match *mode {
            CaptureMode::Fullscreen => {
                let screen = self
                    .geometry
                    .screen_size()
                    .ok_or(RegionError::GeometryUnavailable)?;
                fullscreen_rect(screen)
            }
            CaptureMode::RegionSelect => {
                let raw = self
                    .picker
                    .select_region()?
                    .ok_or(RegionError::SelectionCancelled)?;
                selection_rect(raw)
            }
            CaptureMode::WindowClick => self.resolve_window()?,
            CaptureMode::FixedResolution { w, h } => {
                let monitor = self.monitor()?;
                fixed_rect(w, h, &monitor)?
            }
            CaptureMode::Crop {
                left,
                right,
                top,
                bottom,
            } => {
                let monitor = self.monitor()?;
                crop_rect(left, right, top, bottom, &monitor)?
            }
        };

        validate_rectangle(rect)
    }

    fn monitor(&self) -> Result<MonitorInfo, RegionError> {
        let monitor = self
            .geometry
            .primary_monitor()
            .ok_or(RegionError::GeometryUnavailable)?;
        tracing::debug!(
            "primary monitor {} at {}x{}+{}+{}",
            monitor.name,
            monitor.w,
            monitor.h,
            monitor.x,
            monitor.y
        );
        Ok(monitor)
    }

    fn resolve_window(&self) -> Result<Rectangle, RegionError> {
        let raw = self.picker.pick_window()?;
        let rect = match self.geometry.screen_size() {
            Some(screen) => clamp_window(raw, screen)?,
            None => {
                tracing::warn!(
                    "Screen size unknown; skipping off-screen check for window at {},{} ({}x{})",
                    raw.x,
                    raw.y,
                    raw.w,
                    raw.h
                );
                floor_window_origin(raw)
            }
        };
        Ok(rect.even())
    }
}
