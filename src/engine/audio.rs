// PulseAudio/PipeWire device discovery via pactl

use std::io::{self, BufRead, IsTerminal, Write};
use thiserror::Error;

use crate::engine::core::{AudioDescriptor, AudioKind};
use crate::engine::geometry::run_tool;

/// Fallback pulse device when the default sink cannot be detected
pub const DEFAULT_PULSE_DEVICE: &str = "default";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Several microphones are available but there is no interactive terminal to choose one")]
    NoInteractiveTerminal,

    #[error("No microphone / capture source found")]
    NoCaptureDevice,

    #[error("No microphone selected")]
    NoSelection,

    #[error("pactl failed: {0}")]
    ToolFailed(String),
}

/// One pulse source as listed by `pactl list short sources`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub index: u32,
    pub name: String,
    pub driver: String,
}

impl AudioSource {
    /// Monitor sources mirror an output sink; they are not microphones
    pub fn is_monitor(&self) -> bool {
        self.name.ends_with(".monitor")
    }

    /// One row of the `sources` listing: index, kind, name, owning module
    pub fn listing_row(&self) -> String {
        let kind = if self.is_monitor() { "monitor" } else { "capture" };
        let row = format!("{:>3}  {:<8} {}", self.index, kind, self.name);
        if self.driver.is_empty() {
            row
        } else {
            format!("{}  ({})", row, self.driver)
        }
    }
}

/// Audio server queries
pub trait AudioServer {
    fn default_sink(&self) -> Option<String>;

    fn sources(&self) -> Result<Vec<AudioSource>, AudioError>;
}

/// Operator choice among several capture sources
pub trait DeviceChooser {
    /// Return an index into `sources`
    fn choose(&self, sources: &[AudioSource]) -> Result<usize, AudioError>;
}

pub fn parse_short_sources(output: &str) -> Vec<AudioSource> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let index = fields.next()?.trim().parse().ok()?;
            let name = fields.next()?.trim().to_string();
            let driver = fields.next().unwrap_or("").trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some(AudioSource {
                index,
                name,
                driver,
            })
        })
        .collect()
}

/// Extract the `Default Sink:` line from `pactl info`
pub fn parse_default_sink(info: &str) -> Option<String> {
    info.lines()
        .find_map(|l| l.trim().strip_prefix("Default Sink:"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub struct PactlServer;

impl AudioServer for PactlServer {
    fn default_sink(&self) -> Option<String> {
        // get-default-sink needs pactl >= 15; older servers only have `info`
        if let Some(out) = run_tool("pactl", &["get-default-sink"]) {
            let sink = out.trim();
            if !sink.is_empty() {
                return Some(sink.to_string());
            }
        }
        run_tool("pactl", &["info"]).and_then(|out| parse_default_sink(&out))
    }

    fn sources(&self) -> Result<Vec<AudioSource>, AudioError> {
        run_tool("pactl", &["list", "short", "sources"])
            .map(|out| parse_short_sources(&out))
            .ok_or_else(|| AudioError::ToolFailed("could not list sources".to_string()))
    }
}

/// Numbered prompt on the controlling terminal
pub struct TerminalChooser;

impl DeviceChooser for TerminalChooser {
    fn choose(&self, sources: &[AudioSource]) -> Result<usize, AudioError> {
        if !io::stdin().is_terminal() {
            return Err(AudioError::NoInteractiveTerminal);
        }
        prompt_choice(io::stdin().lock(), io::stderr(), sources)
    }
}

/// Print a numbered menu and read choices until a valid one arrives.
/// End of input aborts with `NoSelection`.
pub fn prompt_choice<R, W>(
    mut input: R,
    mut out: W,
    sources: &[AudioSource],
) -> Result<usize, AudioError>
where
    R: BufRead,
    W: Write,
{
    let _ = writeln!(out, "Available microphones:");
    for (i, source) in sources.iter().enumerate() {
        let _ = writeln!(out, "  {}) {}", i + 1, source.name);
    }

    loop {
        let _ = write!(out, "Select microphone [1-{}]: ", sources.len());
        let _ = out.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return Err(AudioError::NoSelection),
            Ok(_) => {}
        }

        match line.trim().parse::<usize>() {
            Ok(n) if (1..=sources.len()).contains(&n) => return Ok(n - 1),
            _ => {
                let _ = writeln!(out, "Invalid choice: {}", line.trim());
            }
        }
    }
}

/// Which audio inputs the session wants
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioRequest {
    pub system: bool,
    pub microphone: bool,
    pub mute: bool,
}

/// Turn the audio request into encoder inputs. System audio comes first.
pub fn resolve_audio(
    request: AudioRequest,
    server: &dyn AudioServer,
    chooser: &dyn DeviceChooser,
) -> Result<Vec<AudioDescriptor>, AudioError> {
    let mut descriptors = Vec::new();
    if request.mute {
        return Ok(descriptors);
    }

    if request.system {
        let descriptor = match server.default_sink() {
            Some(sink) => AudioDescriptor::new(
                AudioKind::System,
                format!("{}.monitor", sink),
                format!("System audio ({})", sink),
            ),
            None => {
                tracing::warn!(
                    "Could not detect the default sink; using pulse device '{}' for system audio",
                    DEFAULT_PULSE_DEVICE
                );
                AudioDescriptor::new(AudioKind::System, DEFAULT_PULSE_DEVICE, "System audio")
            }
        };
        descriptors.push(descriptor);
    }

    if request.microphone {
        let mics: Vec<AudioSource> = server
            .sources()?
            .into_iter()
            .filter(|s| !s.is_monitor())
            .collect();

        let mic = match mics.len() {
            0 => return Err(AudioError::NoCaptureDevice),
            1 => {
                tracing::info!("Using microphone {}", mics[0].name);
                &mics[0]
            }
            _ => {
                let idx = chooser.choose(&mics)?;
                mics.get(idx).ok_or(AudioError::NoSelection)?
            }
        };
        descriptors.push(AudioDescriptor::new(
            AudioKind::Microphone,
            mic.name.clone(),
            "Microphone",
        ));
    }

    Ok(descriptors)
}
