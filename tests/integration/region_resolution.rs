// Capture-area resolution through the full resolver, with faked geometry and pickers

use screenrec::engine::audio::{AudioError, AudioServer, AudioSource, DeviceChooser};
use screenrec::engine::core::{
    CaptureMode, QualityProfile, RawRect, RecordingConfig, Rectangle,
};
use screenrec::engine::plan::{PlanError, build_plan};
use screenrec::engine::region::{RegionError, RegionResolver};
use std::path::PathBuf;

use crate::common::fakes::*;

fn resolve(
    chain: &screenrec::engine::geometry::GeometryChain,
    picker: &FakePicker,
    mode: CaptureMode,
) -> Result<Rectangle, RegionError> {
    RegionResolver::new(chain, picker).resolve(&mode)
}

#[test]
fn test_fullscreen_uses_virtual_screen() {
    let chain = geometry((3840, 1080), monitor(0, 0, 1920, 1080));
    let rect = resolve(&chain, &FakePicker::cancelled(), CaptureMode::Fullscreen).unwrap();
    assert_eq!(rect, Rectangle::new(0, 0, 3840, 1080));
}

#[test]
fn test_fullscreen_without_geometry_fails() {
    let chain = no_geometry();
    let err = resolve(&chain, &FakePicker::cancelled(), CaptureMode::Fullscreen).unwrap_err();
    assert_eq!(err, RegionError::GeometryUnavailable);
}

#[test]
fn test_region_selection_is_rounded_down_to_even() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::selecting(RawRect::new(100, 200, 641, 479));
    let rect = resolve(&chain, &picker, CaptureMode::RegionSelect).unwrap();
    assert_eq!(rect, Rectangle::new(100, 200, 640, 478));
}

#[test]
fn test_region_selection_cancelled() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let err = resolve(&chain, &FakePicker::cancelled(), CaptureMode::RegionSelect).unwrap_err();
    assert_eq!(err, RegionError::SelectionCancelled);
}

#[test]
fn test_tiny_region_rejected() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::selecting(RawRect::new(10, 10, 15, 300));
    let err = resolve(&chain, &picker, CaptureMode::RegionSelect).unwrap_err();
    assert!(matches!(err, RegionError::InvalidGeometry(_)));
}

#[test]
fn test_window_partly_off_screen_is_clamped() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::clicking(RawRect::new(-50, 100, 800, 600));
    let rect = resolve(&chain, &picker, CaptureMode::WindowClick).unwrap();
    assert_eq!(rect, Rectangle::new(0, 100, 750, 600));
}

#[test]
fn test_window_overhanging_right_edge_is_clamped() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::clicking(RawRect::new(1500, 900, 800, 600));
    let rect = resolve(&chain, &picker, CaptureMode::WindowClick).unwrap();
    assert_eq!(rect, Rectangle::new(1500, 900, 420, 180));
}

#[test]
fn test_window_entirely_off_screen_fails() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::clicking(RawRect::new(2500, 100, 400, 300));
    let err = resolve(&chain, &picker, CaptureMode::WindowClick).unwrap_err();
    assert!(matches!(err, RegionError::WindowOffScreen { x: 2500, .. }));
}

#[test]
fn test_window_without_screen_size_floors_origin() {
    let chain = no_geometry();
    let picker = FakePicker::clicking(RawRect::new(-20, 10, 800, 600));
    let rect = resolve(&chain, &picker, CaptureMode::WindowClick).unwrap();
    assert_eq!(rect, Rectangle::new(0, 10, 800, 600));
}

#[test]
fn test_fixed_resolution_centered_on_primary() {
    let chain = geometry((3840, 1080), monitor(1920, 0, 1920, 1080));
    let rect = resolve(
        &chain,
        &FakePicker::cancelled(),
        CaptureMode::FixedResolution { w: 1280, h: 720 },
    )
    .unwrap();
    assert_eq!(rect, Rectangle::new(2240, 180, 1280, 720));
}

#[test]
fn test_fixed_resolution_larger_than_monitor_fails() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let err = resolve(
        &chain,
        &FakePicker::cancelled(),
        CaptureMode::FixedResolution { w: 2560, h: 1440 },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RegionError::ResolutionExceedsMonitor {
            w: 2560,
            h: 1440,
            ..
        }
    ));
}

#[test]
fn test_fixed_resolution_falls_back_to_whole_screen() {
    // Screen size known, monitor list not
    let chain = screenrec::engine::geometry::GeometryChain::new(vec![Box::new(FixedGeometry {
        screen: Some(screenrec::engine::core::ScreenSize { w: 1920, h: 1080 }),
        monitor: None,
    })]);
    let rect = resolve(
        &chain,
        &FakePicker::cancelled(),
        CaptureMode::FixedResolution { w: 1280, h: 720 },
    )
    .unwrap();
    assert_eq!(rect, Rectangle::new(320, 180, 1280, 720));
}

#[test]
fn test_crop_margins_applied_to_primary() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let rect = resolve(
        &chain,
        &FakePicker::cancelled(),
        CaptureMode::Crop {
            left: 100,
            right: 100,
            top: 50,
            bottom: 50,
        },
    )
    .unwrap();
    assert_eq!(rect, Rectangle::new(100, 50, 1720, 980));
}

#[test]
fn test_crop_too_aggressive_fails() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let err = resolve(
        &chain,
        &FakePicker::cancelled(),
        CaptureMode::Crop {
            left: 960,
            right: 950,
            top: 0,
            bottom: 0,
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RegionError::CropTooAggressive {
            axis: "horizontal",
            ..
        }
    ));
}

struct NoAudio;

impl AudioServer for NoAudio {
    fn default_sink(&self) -> Option<String> {
        None
    }

    fn sources(&self) -> Result<Vec<AudioSource>, AudioError> {
        Ok(Vec::new())
    }
}

impl DeviceChooser for NoAudio {
    fn choose(&self, _sources: &[AudioSource]) -> Result<usize, AudioError> {
        Err(AudioError::NoSelection)
    }
}

fn recording(mode: CaptureMode) -> RecordingConfig {
    RecordingConfig {
        mode,
        quality: QualityProfile::get("light"),
        system_audio: false,
        mic_audio: false,
        mute: false,
        countdown_secs: 0,
        output_path: PathBuf::from("/tmp/out.mp4"),
        display: ":1".to_string(),
        extra_args: String::new(),
    }
}

#[test]
fn test_cancelled_selection_is_not_a_failure() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::cancelled();
    let resolver = RegionResolver::new(&chain, &picker);

    let err = build_plan(
        &recording(CaptureMode::RegionSelect),
        &resolver,
        &NoAudio,
        &NoAudio,
    )
    .unwrap_err();
    assert!(err.is_cancellation());
}

#[test]
fn test_plan_carries_resolved_rect_and_display() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::cancelled();
    let resolver = RegionResolver::new(&chain, &picker);

    let plan = build_plan(
        &recording(CaptureMode::Fullscreen),
        &resolver,
        &NoAudio,
        &NoAudio,
    )
    .unwrap();
    assert_eq!(plan.rect, Rectangle::new(0, 0, 1920, 1080));
    assert_eq!(plan.display, ":1");
    assert!(plan.audio.is_empty());
}

#[test]
fn test_missing_microphone_fails_plan() {
    let chain = geometry((1920, 1080), monitor(0, 0, 1920, 1080));
    let picker = FakePicker::cancelled();
    let resolver = RegionResolver::new(&chain, &picker);
    let mut config = recording(CaptureMode::Fullscreen);
    config.mic_audio = true;

    let err = build_plan(&config, &resolver, &NoAudio, &NoAudio).unwrap_err();
    assert!(matches!(err, PlanError::Audio(AudioError::NoCaptureDevice)));
    assert!(!err.is_cancellation());
}
