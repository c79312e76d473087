//! Bubble Sim - run a headless rendering session and report on it
//!
//! Drives the full runtime (coordinate scaling, render optimizer, pools and
//! adaptive quality) against a recording canvas with synthetic frame times.

mod scene;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bubble_app::{BubbleRuntime, HeadlessRunConfig, HeadlessRuntime};
use bubble_core::BubbleConfig;
use bubble_quality::{DeviceCapabilities, FileStore, MemoryStore, PreferenceStore};

use crate::scene::FramePacing;

/// Headless bubble rendering simulator
#[derive(Parser, Debug)]
#[command(name = "bubble-sim")]
#[command(about = "Run a headless bubble rendering session")]
#[command(version)]
struct Args {
    /// Canvas display width
    #[arg(long, default_value = "800")]
    width: u32,

    /// Canvas display height
    #[arg(long, default_value = "600")]
    height: u32,

    /// Device pixel ratio
    #[arg(long, default_value = "1.0")]
    pixel_ratio: f32,

    /// Frames to simulate
    #[arg(long, default_value = "600")]
    frames: u32,

    /// Bubbles on screen at full particle density
    #[arg(long, default_value = "24")]
    bubbles: usize,

    /// Simulated frame duration in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// Switch to slow frames from this frame on
    #[arg(long)]
    slow_after: Option<u32>,

    /// Frame duration once slow
    #[arg(long, default_value = "30")]
    slow_frame_ms: u64,

    /// Installed memory in GB, for starting-level detection
    #[arg(long)]
    memory_gb: Option<f32>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for persisted quality preferences (in-memory if omitted)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Write the JSON report here (relative path) instead of stdout
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => BubbleConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => BubbleConfig::default(),
    };
    let store: Box<dyn PreferenceStore> = match &args.store {
        Some(dir) => Box::new(FileStore::new(dir)),
        None => Box::new(MemoryStore::new()),
    };
    let caps = DeviceCapabilities {
        memory_gb: args.memory_gb,
        ..DeviceCapabilities::probe()
    };

    let mut runtime = BubbleRuntime::with_capabilities(config, store, &caps)
        .context("invalid runtime configuration")?;

    let cfg = HeadlessRunConfig {
        width: args.width,
        height: args.height,
        pixel_ratio: args.pixel_ratio,
        max_frames: args.frames,
        tick_ms: args.frame_ms.max(1),
    };
    let pacing = FramePacing {
        normal_ms: args.frame_ms,
        slow_ms: args.slow_frame_ms,
        slow_after: args.slow_after,
    };

    tracing::info!(
        frames = args.frames,
        bubbles = args.bubbles,
        level = %runtime.quality().current_level(),
        "starting headless session"
    );
    let report = HeadlessRuntime::simulate(
        &mut runtime,
        cfg,
        args.bubbles,
        scene::bubbles,
        |ctx| pacing.frame_ms(ctx),
    )?;
    runtime.destroy();

    tracing::info!(
        rendered = report.rendered_frames,
        skipped = report.skipped_frames,
        fps = report.average_fps(),
        final_level = %report.final_level,
        "session complete"
    );

    match &args.report {
        Some(path) => report
            .write_to_path(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => report.write_to_writer(&mut io::stdout().lock())?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
