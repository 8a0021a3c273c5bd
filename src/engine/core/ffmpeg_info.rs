use anyhow::{Context, Result};
use std::process::{Command, Stdio};

use super::types::CaptureMode;

/// External tools the recorder may shell out to, with the flag used to check they run
pub const KNOWN_TOOLS: &[(&str, &str)] = &[
    ("ffmpeg", "-version"),
    ("slop", "--version"),
    ("xwininfo", "-version"),
    ("xrandr", "--version"),
    ("xdpyinfo", "-version"),
    ("pactl", "--version"),
];

/// Run `tool flag` and return the first line of its output
pub fn tool_version(tool: &str, flag: &str) -> Result<String> {
    let output = Command::new(tool)
        .arg(flag)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute {}. Is it installed and in PATH?", tool))?;

    // Some X11 utilities print their version on stderr
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).to_string()
    };
    let first_line = text.lines().next().unwrap_or("Unknown version");

    Ok(first_line.trim().to_string())
}

/// True when `tool` can be executed at all (exit status is irrelevant)
pub fn tool_available(tool: &str) -> bool {
    let flag = KNOWN_TOOLS
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, flag)| *flag)
        .unwrap_or("--version");
    Command::new(tool)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Tools a session with this mode and audio setup cannot run without
pub fn required_tools(mode: &CaptureMode, wants_audio: bool) -> Vec<&'static str> {
    let mut tools = vec!["ffmpeg"];
    match mode {
        CaptureMode::RegionSelect => tools.push("slop"),
        CaptureMode::WindowClick => tools.push("xwininfo"),
        _ => {}
    }
    if wants_audio {
        tools.push("pactl");
    }
    tools
}

/// Return the required tools that are missing, using `is_available` to test presence
pub fn missing_tools<F>(mode: &CaptureMode, wants_audio: bool, is_available: F) -> Vec<&'static str>
where
    F: Fn(&str) -> bool,
{
    required_tools(mode, wants_audio)
        .into_iter()
        .filter(|tool| !is_available(tool))
        .collect()
}
