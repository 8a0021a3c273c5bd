use super::profile::QualityProfile;
use super::types::{AudioDescriptor, CapturePlan, Rectangle};
use std::process::Command;

/// Output pixel format; yuv420p keeps the file playable everywhere
pub const PIXEL_FORMAT: &str = "yuv420p";

fn apply_video_input(cmd: &mut Command, rect: &Rectangle, display: &str, frame_rate: u32) {
    cmd.arg("-f").arg("x11grab");
    cmd.arg("-framerate").arg(frame_rate.to_string());
    cmd.arg("-video_size").arg(format!("{}x{}", rect.w, rect.h));
    cmd.arg("-draw_mouse").arg("1");
    cmd.arg("-i").arg(format!("{}+{},{}", display, rect.x, rect.y));
}

fn apply_audio_inputs(cmd: &mut Command, audio: &[AudioDescriptor]) {
    for descriptor in audio {
        cmd.arg("-f").arg("pulse");
        cmd.arg("-i").arg(&descriptor.device_id);
    }
}

/// Build the amix graph for N audio inputs (input 0 is always the screen)
pub fn build_amix_filter(inputs: usize) -> String {
    let pads: String = (1..=inputs).map(|i| format!("[{}:a]", i)).collect();
    let weights = vec!["1"; inputs].join(" ");
    format!(
        "{}amix=inputs={}:duration=longest:weights={}[aout]",
        pads, inputs, weights
    )
}

/// Stream mapping depends only on how many audio inputs exist
fn apply_stream_mapping(cmd: &mut Command, audio_inputs: usize) {
    match audio_inputs {
        0 => {
            cmd.arg("-map").arg("0:v");
            cmd.arg("-an");
        }
        1 => {
            cmd.arg("-map").arg("0:v");
            cmd.arg("-map").arg("1:a");
        }
        n => {
            cmd.arg("-filter_complex").arg(build_amix_filter(n));
            cmd.arg("-map").arg("0:v");
            cmd.arg("-map").arg("[aout]");
        }
    }
}

fn apply_video_encoder(cmd: &mut Command, quality: &QualityProfile) {
    let gop = quality.keyframe_interval().to_string();

    cmd.arg("-c:v").arg("libx264");
    cmd.arg("-preset").arg(&quality.preset);
    cmd.arg("-crf").arg(quality.crf.to_string());
    cmd.arg("-maxrate")
        .arg(format!("{}k", quality.max_video_rate_k));
    cmd.arg("-bufsize").arg(format!("{}k", quality.buffer_size_k));

    // Closed GOP: fixed keyframe spacing, no scene-cut keyframes
    cmd.arg("-g").arg(&gop);
    cmd.arg("-keyint_min").arg(&gop);
    cmd.arg("-sc_threshold").arg("0");
}

fn apply_color_metadata(cmd: &mut Command) {
    cmd.arg("-pix_fmt").arg(PIXEL_FORMAT);
    cmd.arg("-colorspace").arg("bt709");
    cmd.arg("-color_primaries").arg("bt709");
    cmd.arg("-color_trc").arg("bt709");
    cmd.arg("-color_range").arg("tv");
}

fn apply_audio_encoder(cmd: &mut Command, quality: &QualityProfile, audio_inputs: usize) {
    if audio_inputs == 0 {
        return;
    }
    cmd.arg("-c:a").arg("aac");
    cmd.arg("-b:a").arg(format!("{}k", quality.audio_bitrate_k));
}

/// Apply additional user-provided FFmpeg arguments to the command.
/// Uses shell-style parsing so quoted strings with spaces are preserved.
fn apply_additional_args(cmd: &mut Command, additional_args: &str) {
    if additional_args.trim().is_empty() {
        return;
    }

    if let Some(args) = shlex::split(additional_args) {
        cmd.args(args);
    } else {
        // Unbalanced quotes: fall back to a plain whitespace split
        cmd.args(additional_args.split_whitespace());
    }
}

/// Assemble the full ffmpeg invocation for a capture plan
pub fn build_capture_cmd(plan: &CapturePlan) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y").arg("-hide_banner");
    cmd.arg("-loglevel").arg("info");

    apply_video_input(&mut cmd, &plan.rect, &plan.display, plan.quality.frame_rate);
    apply_audio_inputs(&mut cmd, &plan.audio);
    apply_stream_mapping(&mut cmd, plan.audio.len());
    apply_video_encoder(&mut cmd, &plan.quality);
    apply_color_metadata(&mut cmd);
    apply_audio_encoder(&mut cmd, &plan.quality, plan.audio.len());
    apply_additional_args(&mut cmd, &plan.extra_args);

    // Index at the front of the file for progressive playback
    cmd.arg("-movflags").arg("+faststart");
    cmd.arg(&plan.output_path);
    cmd
}

/// Render a command as a single shell-pasteable line
pub fn format_ffmpeg_cmd(cmd: &Command) -> String {
    let words: Vec<String> = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| arg.to_string_lossy().to_string())
        .collect();

    shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
}

/// Human-readable parameter summary written to the session log before launch
pub fn plan_summary(plan: &CapturePlan) -> Vec<String> {
    let q = &plan.quality;
    let mut lines = vec![
        format!("Geometry: {} on display {}", plan.rect, plan.display),
        format!(
            "Quality: {} ({} fps, crf {}, preset {}, maxrate {}k, bufsize {}k, gop {})",
            q.name,
            q.frame_rate,
            q.crf,
            q.preset,
            q.max_video_rate_k,
            q.buffer_size_k,
            q.keyframe_interval()
        ),
    ];

    if plan.audio.is_empty() {
        lines.push("Audio: none".to_string());
    } else {
        for descriptor in &plan.audio {
            lines.push(format!(
                "Audio: {:?} {} ({}) @ {}k",
                descriptor.kind, descriptor.device_id, descriptor.label, q.audio_bitrate_k
            ));
        }
    }

    lines.push(format!("Output: {}", plan.output_path.display()));
    lines
}
