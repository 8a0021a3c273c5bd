use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static encoder parameters for one quality level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub name: String,
    pub frame_rate: u32,
    /// libx264 constant rate factor
    pub crf: u32,
    pub preset: String,
    pub audio_bitrate_k: u32,
    pub max_video_rate_k: u32,
    pub buffer_size_k: u32,
}

pub const QUALITY_PROFILES: &[&str] = &["professional", "light"];

impl QualityProfile {
    /// Look up a built-in profile by name, falling back to "professional"
    pub fn get(name: &str) -> Self {
        Self::lookup(name).unwrap_or_else(Self::professional)
    }

    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "professional" => Some(Self::professional()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }

    fn professional() -> Self {
        Self {
            name: "professional".to_string(),
            frame_rate: 60,
            crf: 18,
            preset: "medium".to_string(),
            audio_bitrate_k: 192,
            max_video_rate_k: 20_000,
            buffer_size_k: 40_000,
        }
    }

    fn light() -> Self {
        Self {
            name: "light".to_string(),
            frame_rate: 30,
            crf: 26,
            preset: "veryfast".to_string(),
            audio_bitrate_k: 128,
            max_video_rate_k: 4_000,
            buffer_size_k: 8_000,
        }
    }

    /// GOP size in frames: two seconds of video
    pub fn keyframe_interval(&self) -> u32 {
        self.frame_rate * 2
    }
}

/// Expand the filename pattern and join it onto the output directory.
/// Supports: {timestamp}. Appends .mp4 when the pattern has no extension.
pub fn derive_output_path(dir: &Path, pattern: &str, now: DateTime<Local>) -> PathBuf {
    let stamp = now.format("%Y-%m-%d_%H-%M-%S").to_string();
    let mut name = pattern.replace("{timestamp}", &stamp);
    if Path::new(&name).extension().is_none() {
        name.push_str(".mp4");
    }
    dir.join(name)
}
