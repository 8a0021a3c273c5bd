// Integration tests for ffmpeg command generation from capture plans
//
// Stream mapping depends only on how many audio inputs the plan carries

use screenrec::engine::core::{
    AudioDescriptor, AudioKind, CapturePlan, QualityProfile, Rectangle, build_capture_cmd,
    format_ffmpeg_cmd,
};
use std::path::PathBuf;

use crate::common::assertions::*;

fn plan(quality: &str, audio: Vec<AudioDescriptor>) -> CapturePlan {
    CapturePlan {
        rect: Rectangle::new(100, 50, 1720, 980),
        display: ":0".to_string(),
        quality: QualityProfile::get(quality),
        audio,
        output_path: PathBuf::from("/tmp/rec/out.mp4"),
        extra_args: String::new(),
    }
}

fn system() -> AudioDescriptor {
    AudioDescriptor::new(
        AudioKind::System,
        "alsa_output.pci.analog-stereo.monitor",
        "System audio",
    )
}

fn mic() -> AudioDescriptor {
    AudioDescriptor::new(AudioKind::Microphone, "alsa_input.usb-mic", "Microphone")
}

// ============================================================================
// Video input
// ============================================================================

#[test]
fn test_video_input_uses_rect_and_display() {
    let cmd = build_capture_cmd(&plan("professional", vec![]));
    assert_cmd_has_flag_value(&cmd, "-f", "x11grab");
    assert_cmd_has_flag_value(&cmd, "-video_size", "1720x980");
    assert_cmd_has_flag_value(&cmd, "-i", ":0+100,50");
    assert_cmd_has_flag_value(&cmd, "-framerate", "60");
    assert_cmd_has_flag_value(&cmd, "-draw_mouse", "1");
}

#[test]
fn test_output_path_is_last() {
    let cmd = build_capture_cmd(&plan("light", vec![system()]));
    let args = cmd_args(&cmd);
    assert_eq!(args.last().map(String::as_str), Some("/tmp/rec/out.mp4"));
    assert_cmd_has_flag_value(&cmd, "-movflags", "+faststart");
}

// ============================================================================
// Stream mapping by audio input count
// ============================================================================

#[test]
fn test_no_audio_disables_audio_stream() {
    let cmd = build_capture_cmd(&plan("professional", vec![]));
    assert_cmd_has_flag_value(&cmd, "-map", "0:v");
    assert_cmd_not_contains(&cmd, "-c:a");
    assert_cmd_not_contains(&cmd, "-filter_complex");
    assert_cmd_not_contains(&cmd, "pulse");
    assert!(cmd_args(&cmd).iter().any(|a| a == "-an"));
}

#[test]
fn test_single_audio_input_mapped_directly() {
    let cmd = build_capture_cmd(&plan("professional", vec![mic()]));
    assert_eq!(count_flag(&cmd, "-map"), 2);
    assert_cmd_has_flag_value(&cmd, "-map", "1:a");
    assert_cmd_has_flag_value(&cmd, "-i", "alsa_input.usb-mic");
    assert_cmd_has_flag_value(&cmd, "-c:a", "aac");
    assert_cmd_has_flag_value(&cmd, "-b:a", "192k");
    assert_cmd_not_contains(&cmd, "-an");
    assert_cmd_not_contains(&cmd, "-filter_complex");
}

#[test]
fn test_two_audio_inputs_are_mixed() {
    let cmd = build_capture_cmd(&plan("light", vec![system(), mic()]));
    assert_cmd_has_flag_value(
        &cmd,
        "-filter_complex",
        "[1:a][2:a]amix=inputs=2:duration=longest:weights=1 1[aout]",
    );
    assert_cmd_has_flag_value(&cmd, "-map", "[aout]");
    assert_cmd_has_flag_value(&cmd, "-b:a", "128k");
    assert_eq!(count_flag(&cmd, "pulse"), 2);
    assert_cmd_not_contains(&cmd, "-an");
}

#[test]
fn test_system_audio_precedes_microphone() {
    let cmd = build_capture_cmd(&plan("light", vec![system(), mic()]));
    let args = cmd_args(&cmd);
    let sys = args
        .iter()
        .position(|a| a == "alsa_output.pci.analog-stereo.monitor")
        .unwrap();
    let mic = args.iter().position(|a| a == "alsa_input.usb-mic").unwrap();
    assert!(sys < mic);
}

// ============================================================================
// Encoder settings
// ============================================================================

#[test]
fn test_closed_gop_tracks_frame_rate() {
    let pro = build_capture_cmd(&plan("professional", vec![]));
    assert_cmd_has_flag_value(&pro, "-g", "120");
    assert_cmd_has_flag_value(&pro, "-keyint_min", "120");
    assert_cmd_has_flag_value(&pro, "-sc_threshold", "0");

    let light = build_capture_cmd(&plan("light", vec![]));
    assert_cmd_has_flag_value(&light, "-g", "60");
    assert_cmd_has_flag_value(&light, "-keyint_min", "60");
}

#[test]
fn test_color_metadata_is_bt709_limited_range() {
    let cmd = build_capture_cmd(&plan("light", vec![]));
    assert_cmd_has_flag_value(&cmd, "-pix_fmt", "yuv420p");
    assert_cmd_has_flag_value(&cmd, "-colorspace", "bt709");
    assert_cmd_has_flag_value(&cmd, "-color_primaries", "bt709");
    assert_cmd_has_flag_value(&cmd, "-color_trc", "bt709");
    assert_cmd_has_flag_value(&cmd, "-color_range", "tv");
}

#[test]
fn test_extra_args_placed_before_output() {
    let mut p = plan("light", vec![]);
    p.extra_args = "-metadata title='Weekly demo'".to_string();
    let cmd = build_capture_cmd(&p);
    let args = cmd_args(&cmd);

    let pos = args.iter().position(|a| a == "title=Weekly demo").unwrap();
    let movflags = args.iter().position(|a| a == "-movflags").unwrap();
    assert!(pos < movflags);
}

#[test]
fn test_formatted_command_splits_back_to_args() {
    let mut p = plan("professional", vec![system(), mic()]);
    p.output_path = PathBuf::from("/tmp/my recordings/out.mp4");
    let cmd = build_capture_cmd(&p);

    let line = format_ffmpeg_cmd(&cmd);
    let words = shlex::split(&line).unwrap();
    assert_eq!(words[0], "ffmpeg");
    assert_eq!(words[1..], cmd_args(&cmd)[..]);
}
