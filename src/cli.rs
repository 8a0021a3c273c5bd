use clap::builder::PossibleValuesParser;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use screenrec::engine::{CaptureMode, QUALITY_PROFILES};

#[derive(Parser)]
#[command(name = "screenrec")]
#[command(about = "Record the X11 desktop with ffmpeg", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .args(["fullscreen", "region", "window", "size", "crop"])
        .multiple(false)
))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Record the whole virtual screen (default)
    #[arg(long)]
    pub fullscreen: bool,

    /// Drag-select the area to record
    #[arg(long)]
    pub region: bool,

    /// Click a window to record its area
    #[arg(long)]
    pub window: bool,

    /// Record a WxH area centered on the primary monitor
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub size: Option<Size>,

    /// Record the primary monitor minus margins
    #[arg(long, value_name = "LEFT,RIGHT,TOP,BOTTOM", value_parser = parse_crop)]
    pub crop: Option<CropMargins>,

    /// Quality profile (overrides config)
    #[arg(short, long, value_parser = PossibleValuesParser::new(QUALITY_PROFILES.iter().copied()))]
    pub quality: Option<String>,

    /// Capture what the speakers play
    #[arg(long, conflicts_with = "mute")]
    pub system_audio: bool,

    /// Capture a microphone
    #[arg(long, conflicts_with = "mute")]
    pub mic: bool,

    /// Record video only
    #[arg(long)]
    pub mute: bool,

    /// Seconds to count down before recording (overrides config)
    #[arg(long, value_name = "SECONDS")]
    pub countdown: Option<u32>,

    /// Output file (defaults to a timestamped file in the output directory)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Show the ffmpeg command without recording
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that ffmpeg and the X11/audio helper tools are installed
    CheckDeps,

    /// Show the virtual screen and primary monitor geometry
    Geometry {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List audio sources known to the sound server
    Sources,

    /// Show config status and location, or create default config if missing
    InitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropMargins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", w))?;
    let h = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", h))?;
    Ok(Size { w, h })
}

fn parse_crop(s: &str) -> Result<CropMargins, String> {
    let values: Vec<u32> = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid crop margin '{}'", v.trim()))
        })
        .collect::<Result<_, _>>()?;

    match values.as_slice() {
        [left, right, top, bottom] => Ok(CropMargins {
            left: *left,
            right: *right,
            top: *top,
            bottom: *bottom,
        }),
        _ => Err(format!(
            "expected four margins LEFT,RIGHT,TOP,BOTTOM, got {}",
            values.len()
        )),
    }
}

impl Cli {
    /// The single capture mode selected on the command line
    pub fn capture_mode(&self) -> CaptureMode {
        if self.region {
            CaptureMode::RegionSelect
        } else if self.window {
            CaptureMode::WindowClick
        } else if let Some(size) = self.size {
            CaptureMode::FixedResolution {
                w: size.w,
                h: size.h,
            }
        } else if let Some(m) = self.crop {
            CaptureMode::Crop {
                left: m.left,
                right: m.right,
                top: m.top,
                bottom: m.bottom,
            }
        } else {
            CaptureMode::Fullscreen
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
