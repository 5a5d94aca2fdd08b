//! Ghostwatch Agent CLI
//!
//! Runs the anomaly-detection pipeline against synthetic sensor sources.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ghostwatch_agent::{
    activity::{create_shared_log_with_persistence, read_persisted},
    collector::{SensorSources, SyntheticCamera, SyntheticMicrophone, SyntheticMotion},
    config::Config,
    core::VisionMode,
    Pipeline, PipelineStatus, VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ghostwatch")]
#[command(version = VERSION)]
#[command(about = "Real-time anomaly detection over camera, audio and motion streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline against synthetic sensors
    Run {
        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration: Option<u64>,

        /// Camera frame rate
        #[arg(long, default_value = "15")]
        fps: u32,

        /// Camera frame width
        #[arg(long, default_value = "160")]
        width: u32,

        /// Camera frame height
        #[arg(long, default_value = "120")]
        height: u32,

        /// Stall the camera after this many frames to exercise recovery
        #[arg(long)]
        stall_after: Option<u64>,

        /// Vision mode (normal, infrared, night_vision)
        #[arg(long)]
        vision: Option<VisionMode>,

        /// Override the motion pixel sensitivity
        #[arg(long)]
        sensitivity: Option<u32>,

        /// Override the luminance spike threshold (percent)
        #[arg(long)]
        luminance_threshold: Option<f64>,

        /// Skip audio peak detection
        #[arg(long)]
        no_audio: bool,

        /// Skip device motion detection
        #[arg(long)]
        no_motion: bool,
    },

    /// Show statistics from previous sessions
    Status,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },

    /// List vision modes
    Modes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ghostwatch_agent=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            duration,
            fps,
            width,
            height,
            stall_after,
            vision,
            sensitivity,
            luminance_threshold,
            no_audio,
            no_motion,
        } => {
            let mut config = Config::load().context("loading configuration")?;
            if let Some(mode) = vision {
                config.vision_mode = mode;
            }
            if let Some(sensitivity) = sensitivity {
                config.motion_sensitivity = sensitivity;
            }
            if let Some(threshold) = luminance_threshold {
                config.luminance_delta_percent_threshold = threshold;
            }
            config.audio_enabled &= !no_audio;
            config.motion_enabled &= !no_motion;

            let camera = SyntheticCamera {
                width,
                height,
                fps,
                stall_after,
                ..SyntheticCamera::default()
            };
            cmd_run(config, camera, duration.map(Duration::from_secs)).await
        }
        Commands::Status => cmd_status(),
        Commands::Config { init } => cmd_config(init),
        Commands::Modes => {
            cmd_modes();
            Ok(())
        }
    }
}

async fn cmd_run(
    config: Config,
    camera: SyntheticCamera,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    println!("Ghostwatch Agent v{VERSION}");
    println!();

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Starting pipeline...");
    println!("  Camera: {}x{} @ {} fps", camera.width, camera.height, camera.fps);
    if let Some(limit) = camera.stall_after {
        println!("  Camera stalls after {limit} frames");
    }
    println!("  Vision mode: {}", config.vision_mode.as_str());
    println!("  Audio: {}", if config.audio_enabled { "enabled" } else { "disabled" });
    println!("  Motion: {}", if config.motion_enabled { "enabled" } else { "disabled" });
    println!("  Heartbeat: {}ms", config.heartbeat_interval.as_millis());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let activity = create_shared_log_with_persistence(config.activity_log_path());
    let sources = SensorSources::new(
        Box::new(camera.into_source()),
        Box::new(SyntheticMicrophone::default().into_source()),
        Box::new(SyntheticMotion::default().into_source()),
    );
    let pipeline = Pipeline::with_activity_log(config, sources, None, activity.clone())
        .context("invalid configuration")?;

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let status = pipeline.start().await?;
    println!("Pipeline {status}");

    let alerts = pipeline.alerts();
    let mut status_rx = pipeline.subscribe_status();
    let started = tokio::time::Instant::now();

    while running.load(Ordering::SeqCst) {
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }

        for alert in alerts.try_iter() {
            println!("[{}] {}", alert.timestamp.format("%H:%M:%S"), alert.message);
        }
        if status_rx.has_changed().unwrap_or(false) {
            let status = *status_rx.borrow_and_update();
            if status != PipelineStatus::Running {
                println!("Pipeline {status}");
            }
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!();
    println!("Stopping pipeline...");
    pipeline.stop().await;

    let trails = pipeline.trails();
    if !trails.is_empty() {
        println!("Motion trails retained: {}", trails.len());
    }

    println!();
    println!("{}", activity.summary());
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Ghostwatch Agent Status");
    println!("=======================");
    println!();

    println!("Configuration:");
    println!("  Vision mode: {}", config.vision_mode.as_str());
    println!("  Motion sensitivity: {}", config.motion_sensitivity);
    println!("  Luminance threshold: {}%", config.luminance_delta_percent_threshold);
    println!("  Audio peak threshold: {}", config.audio_peak_threshold);
    println!("  Heartbeat interval: {}ms", config.heartbeat_interval.as_millis());
    println!();

    let stats_path = config.activity_log_path();
    if !stats_path.exists() {
        println!("No previous session data found.");
        return Ok(());
    }

    let stats = read_persisted(&stats_path)
        .with_context(|| format!("reading {}", stats_path.display()))?;
    println!("Cumulative Statistics:");
    println!("  Frames processed: {}", stats.frames_processed);
    println!("  Alerts raised: {}", stats.alerts.total());
    println!("  Alerts suppressed: {}", stats.alerts_suppressed);
    println!(
        "  Stream restarts: {} ({} degraded)",
        stats.restarts, stats.restart_failures
    );
    println!("  Classifier failures: {}", stats.classifier_failures);
    println!("  Last updated: {}", stats.last_updated.format("%Y-%m-%d %H:%M:%S"));

    if !stats.recent.is_empty() {
        println!();
        println!("Recent activity:");
        for entry in stats.recent.iter().rev().take(10) {
            println!("  [{}] {}", entry.time.format("%H:%M:%S"), entry.message);
        }
    }
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if init {
        config.save().context("saving configuration")?;
        println!();
        println!("Configuration written.");
    }
    Ok(())
}

fn cmd_modes() {
    let configured = Config::load().map(|config| config.vision_mode).ok();

    println!("Vision modes:");
    for mode in VisionMode::ALL {
        let current = configured == Some(mode);
        println!("  {}{}", mode.as_str(), if current { " (configured)" } else { "" });
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
