use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::profile::QualityProfile;

/// Smallest width or height ffmpeg is ever asked to capture
pub const MIN_CAPTURE_DIM: u32 = 16;

/// Upper bound for fixed-resolution requests (8K UHD)
pub const MAX_CAPTURE_WIDTH: u32 = 7680;
pub const MAX_CAPTURE_HEIGHT: u32 = 4320;

/// Capture rectangle in virtual-screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rectangle {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Round both dimensions down to the nearest even value (libx264 + yuv420p requirement)
    pub fn even(self) -> Self {
        Self {
            w: round_down_even(self.w),
            h: round_down_even(self.h),
            ..self
        }
    }

    /// True when the rectangle can be handed to the encoder as-is
    pub fn is_encodable(&self) -> bool {
        self.w >= MIN_CAPTURE_DIM
            && self.h >= MIN_CAPTURE_DIM
            && self.w % 2 == 0
            && self.h % 2 == 0
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

pub fn round_down_even(v: u32) -> u32 {
    v & !1
}

/// Unvalidated geometry as reported by a window picker.
/// Origins may be negative and extents may run past the screen edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl RawRect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }
}

impl From<Rectangle> for RawRect {
    fn from(r: Rectangle) -> Self {
        Self::new(r.x as i64, r.y as i64, r.w as i64, r.h as i64)
    }
}

/// Dimensions of the combined virtual screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub w: u32,
    pub h: u32,
}

/// Placement of the primary monitor inside the virtual screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub name: String,
}

impl MonitorInfo {
    /// Synthetic monitor covering the whole virtual screen, used when the
    /// display system exposes no per-monitor metadata
    pub fn whole_screen(screen: ScreenSize) -> Self {
        Self {
            x: 0,
            y: 0,
            w: screen.w,
            h: screen.h,
            name: "screen".to_string(),
        }
    }
}

/// How the capture rectangle is chosen. Exactly one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    Fullscreen,
    RegionSelect,
    WindowClick,
    FixedResolution { w: u32, h: u32 },
    Crop {
        left: u32,
        right: u32,
        top: u32,
        bottom: u32,
    },
}

impl CaptureMode {
    pub fn label(&self) -> String {
        match self {
            Self::Fullscreen => "fullscreen".to_string(),
            Self::RegionSelect => "region".to_string(),
            Self::WindowClick => "window".to_string(),
            Self::FixedResolution { w, h } => format!("size {}x{}", w, h),
            Self::Crop {
                left,
                right,
                top,
                bottom,
            } => format!("crop l={} r={} t={} b={}", left, right, top, bottom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioKind {
    System,
    Microphone,
}

/// One pulse input handed to ffmpeg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDescriptor {
    pub kind: AudioKind,
    pub device_id: String,
    pub label: String,
}

impl AudioDescriptor {
    pub fn new(kind: AudioKind, device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind,
            device_id: device_id.into(),
            label: label.into(),
        }
    }
}

/// Validated, immutable description of one recording session
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    pub mode: CaptureMode,
    pub quality: QualityProfile,
    pub system_audio: bool,
    pub mic_audio: bool,
    pub mute: bool,
    pub countdown_secs: u32,
    pub output_path: PathBuf,
    /// X11 display string passed to x11grab (e.g. ":0")
    pub display: String,
    pub extra_args: String,
}

impl RecordingConfig {
    pub fn wants_audio(&self) -> bool {
        !self.mute && (self.system_audio || self.mic_audio)
    }
}

/// Everything the encoder command is built from
#[derive(Debug, Clone)]
pub struct CapturePlan {
    pub rect: Rectangle,
    pub display: String,
    pub quality: QualityProfile,
    pub audio: Vec<AudioDescriptor>,
    pub output_path: PathBuf,
    /// User-supplied ffmpeg output options, shell-quoted
    pub extra_args: String,
}
