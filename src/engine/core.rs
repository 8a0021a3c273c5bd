mod ffmpeg_cmd;
mod ffmpeg_info;
mod log;
mod profile;
mod types;

pub use ffmpeg_cmd::{
    PIXEL_FORMAT, build_amix_filter, build_capture_cmd, format_ffmpeg_cmd, plan_summary,
};
pub use ffmpeg_info::{
    KNOWN_TOOLS, missing_tools, required_tools, tool_available, tool_version,
};
pub use log::SessionLog;
pub use profile::{QUALITY_PROFILES, QualityProfile, derive_output_path};
pub use types::{
    AudioDescriptor, AudioKind, CaptureMode, CapturePlan, MAX_CAPTURE_HEIGHT, MAX_CAPTURE_WIDTH,
    MIN_CAPTURE_DIM, MonitorInfo, RawRect, Rectangle, RecordingConfig, ScreenSize,
    round_down_even,
};
