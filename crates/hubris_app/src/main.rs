//! # hubris_app — reference host
//!
//! Stands in for the game engine: installs the process-wide coordinator and
//! drives it from a wall-clock frame loop.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (JSON file, then command-line overrides).
//! 2. Install the coordinator.
//! 3. Run frames until the frame limit or Ctrl-C.
//! 4. Shut the coordinator down explicitly.

mod session;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hubris_core::{Coordinator, HubrisConfig};
use session::Session;

#[derive(Parser)]
#[command(name = "hubris_app", about = "Drive the Hubris coordinator from a frame clock")]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host frames per second (overrides the config file)
    #[arg(short, long)]
    frame_rate: Option<f64>,

    /// Tick interval in seconds (overrides the config file)
    #[arg(short, long)]
    interval: Option<f64>,

    /// Number of frames to run (0 = until Ctrl-C)
    #[arg(short = 'n', long, default_value_t = 0)]
    frames: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hubris_app=info,hubris_core=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        frame_rate = config.frame_rate,
        interval_secs = config.tick.interval_secs,
        overflow = ?config.tick.overflow,
        listener_failures = ?config.tick.listener_failures,
        "configuration loaded"
    );

    let coordinator = Coordinator::install(config.tick.clone())
        .context("failed to initialise coordinator")?
        .context("a coordinator is already installed in this process")?;
    let mut session = Session::new(coordinator);

    let frame_budget = Duration::from_secs_f64(config.frame_secs());
    let mut clock = tokio::time::interval(frame_budget);
    clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last = Instant::now();
    let mut frames = 0u64;
    loop {
        tokio::select! {
            _ = clock.tick() => {}
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                info!("interrupted");
                break;
            }
        }

        let now = Instant::now();
        let delta = now.duration_since(last);
        last = now;

        let start = Instant::now();
        session.frame(delta.as_secs_f64())?;
        let elapsed = start.elapsed();
        if elapsed > frame_budget {
            warn!(
                frame = frames,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = frame_budget.as_millis() as u64,
                "frame exceeded time budget"
            );
        }

        frames += 1;
        if args.frames > 0 && frames >= args.frames {
            info!(frames, "frame limit reached");
            break;
        }
    }

    session.shutdown();
    Ok(())
}

fn load_config(args: &Args) -> Result<HubrisConfig> {
    let mut config = match &args.config {
        Some(path) => HubrisConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => HubrisConfig::default(),
    };
    if let Some(frame_rate) = args.frame_rate {
        config.frame_rate = frame_rate;
    }
    if let Some(interval) = args.interval {
        config.tick.interval_secs = interval;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
