use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use screenrec::config::Config;
use screenrec::engine::audio::{AudioServer, PactlServer, TerminalChooser};
use screenrec::engine::geometry::GeometryChain;
use screenrec::engine::plan::build_plan;
use screenrec::engine::region::{RegionResolver, X11Picker};
use screenrec::engine::session::{
    Cleanup, OsLauncher, OutputStatus, SessionSupervisor, SupervisorOptions,
};
use screenrec::engine::signals::ForwardToChild;
use screenrec::engine::{
    self, KNOWN_TOOLS, QualityProfile, RecordingConfig, SessionLog, build_capture_cmd,
    derive_output_path, format_ffmpeg_cmd, missing_tools, tool_available,
};
use serde::Serialize;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

/// Recording finished and the output looks valid (also: selection cancelled)
pub const EXIT_OK: i32 = 0;
/// Environment, geometry or input failure before or during launch
pub const EXIT_FAILURE: i32 = 1;
/// Recording ran but the output is missing or suspiciously small
pub const EXIT_WARNING: i32 = 3;

pub fn init_logging() {
    let default_level = if cfg!(feature = "dev-logging") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

pub fn run(cli: Cli) {
    let code = match cli.command {
        Some(Commands::CheckDeps) => handle_check_deps(),
        Some(Commands::Geometry { json }) => handle_geometry(json),
        Some(Commands::Sources) => handle_sources(),
        Some(Commands::InitConfig) => handle_init_config(),
        None => match handle_record(&cli) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("{:#}", e);
                EXIT_FAILURE
            }
        },
    };
    process::exit(code);
}

/// Merge CLI flags over config defaults into the immutable session config
fn recording_config(cli: &Cli, config: &Config) -> RecordingConfig {
    let quality_name = cli
        .quality
        .clone()
        .unwrap_or_else(|| config.recording.quality.clone());
    let quality = QualityProfile::lookup(&quality_name).unwrap_or_else(|| {
        tracing::warn!(
            "Unknown quality profile '{}' in config; using professional",
            quality_name
        );
        QualityProfile::get("professional")
    });

    let output_path = cli.output.clone().unwrap_or_else(|| {
        derive_output_path(
            &config.output_dir(),
            &config.recording.filename_pattern,
            chrono::Local::now(),
        )
    });

    RecordingConfig {
        mode: cli.capture_mode(),
        quality,
        system_audio: cli.system_audio,
        mic_audio: cli.mic,
        mute: cli.mute,
        countdown_secs: cli.countdown.unwrap_or(config.recording.countdown_secs),
        output_path,
        display: config.display(),
        extra_args: config.recording.extra_args.clone(),
    }
}

fn handle_record(cli: &Cli) -> Result<i32> {
    let config = Config::load_or_default();
    let recording = recording_config(cli, &config);

    let mut missing = missing_tools(&recording.mode, recording.wants_audio(), tool_available);
    if cli.dry_run {
        missing.retain(|tool| *tool != "ffmpeg");
    }
    if !missing.is_empty() {
        anyhow::bail!("Missing required tools: {}", missing.join(", "));
    }

    let log = SessionLog::new(config.session_log_path());
    log.write(&format!(
        "=== Session start: mode {}, quality {} ===",
        recording.mode.label(),
        recording.quality.name
    ))
    .ok();

    let geometry = GeometryChain::system();
    let picker = X11Picker;
    let resolver = RegionResolver::new(&geometry, &picker);

    let plan = match build_plan(&recording, &resolver, &PactlServer, &TerminalChooser) {
        Ok(plan) => plan,
        Err(e) if e.is_cancellation() => {
            tracing::info!("Selection cancelled; nothing recorded");
            log.write("Selection cancelled").ok();
            return Ok(EXIT_OK);
        }
        Err(e) => {
            log.write(&format!("Status: failed: {}", e)).ok();
            return Err(e.into());
        }
    };

    if cli.dry_run {
        println!("{}", format_ffmpeg_cmd(&build_capture_cmd(&plan)));
        return Ok(EXIT_OK);
    }

    if let Some(parent) = plan.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }

    let launcher = OsLauncher;
    let isolation = ForwardToChild::new();
    let supervisor = SessionSupervisor::new(
        &launcher,
        &isolation,
        log.clone(),
        SupervisorOptions {
            countdown_secs: recording.countdown_secs,
            ..SupervisorOptions::default()
        },
    );

    let outcome = supervisor.run(&plan, &mut io::stderr())?;

    if outcome.cleanup == Cleanup::Killed {
        tracing::warn!("ffmpeg had to be killed; the recording may be unplayable");
    }

    let code = match outcome.output {
        OutputStatus::Succeeded { bytes } => {
            tracing::info!(
                "Saved {} ({:.1} MB)",
                plan.output_path.display(),
                bytes as f64 / 1_048_576.0
            );
            EXIT_OK
        }
        OutputStatus::SmallOutput { bytes } => {
            tracing::warn!(
                "Output {} is only {} bytes; ffmpeg probably failed at startup. See {}",
                plan.output_path.display(),
                bytes,
                log.path().display()
            );
            EXIT_WARNING
        }
        OutputStatus::NoOutput => {
            tracing::warn!(
                "No output was produced. See {}",
                log.path().display()
            );
            EXIT_WARNING
        }
    };
    Ok(code)
}

fn handle_check_deps() -> i32 {
    let mut ffmpeg_found = false;
    for (tool, flag) in KNOWN_TOOLS {
        match engine::tool_version(tool, flag) {
            Ok(version) => {
                println!("{:<10} {}", tool, version);
                if *tool == "ffmpeg" {
                    ffmpeg_found = true;
                }
            }
            Err(_) => println!("{:<10} missing", tool),
        }
    }

    if ffmpeg_found {
        EXIT_OK
    } else {
        eprintln!("Error: ffmpeg is required");
        EXIT_FAILURE
    }
}

#[derive(Serialize)]
struct GeometryReport {
    screen: Option<engine::ScreenSize>,
    primary_monitor: Option<engine::MonitorInfo>,
}

fn handle_geometry(json: bool) -> i32 {
    let chain = GeometryChain::system();
    let report = GeometryReport {
        screen: chain.screen_size(),
        primary_monitor: chain.primary_monitor(),
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_FAILURE;
            }
        }
    } else {
        match report.screen {
            Some(s) => println!("Virtual screen: {}x{}", s.w, s.h),
            None => println!("Virtual screen: unknown"),
        }
        match &report.primary_monitor {
            Some(m) => println!("Primary monitor: {} {}x{}+{}+{}", m.name, m.w, m.h, m.x, m.y),
            None => println!("Primary monitor: unknown"),
        }
    }

    if report.screen.is_some() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

fn handle_sources() -> i32 {
    let server = PactlServer;
    let sink = server.default_sink();
    match server.sources() {
        Ok(sources) => {
            println!("Default sink: {}", sink.as_deref().unwrap_or("unknown"));
            for source in sources {
                println!("{}", source.listing_row());
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

fn handle_init_config() -> i32 {
    let path = match Config::config_path() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: Failed to determine config path: {:#}", e);
            return EXIT_FAILURE;
        }
    };

    if Config::exists() {
        println!("Config file exists: {}", path.display());
        return EXIT_OK;
    }

    match Config::ensure_default() {
        Ok(()) => {
            println!("Created default config: {}", path.display());
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: Failed to create config: {:#}", e);
            EXIT_FAILURE
        }
    }
}
