//! CLI entry point for scope
//!
//! Provides command-line interface for:
//! - Running a configured time-lapse experiment
//! - One-shot z-stack and tiled xy field acquisitions
//!
//! # Usage
//!
//! Run an experiment:
//! ```bash
//! scope run --config config/scope.toml --name "opto pulse 1s"
//! ```
//!
//! Acquire a z-stack into the current directory:
//! ```bash
//! scope zstack --channels DIC --channels mCherry --depth 20 --step 1
//! ```
//!
//! Set `RUST_LOG=scope_experiment=debug` for per-task logging.

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scope_driver_mock::{MockMicroscope, MockMode, TimingConfig};
use scope_experiment::snapshot::{snap_xyfield, snap_zstack, stack_stamp};
use scope_experiment::{
    run_picker_session, warm_up_camera, Experiment, ExperimentPlan, PickerCommand,
    PositionRegistry, Scheduler, ScopeConfig,
};
use scope_storage::{experiment_dir, SessionLayout, SessionRecorder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/scope.toml";

#[derive(Parser)]
#[command(name = "scope")]
#[command(about = "Time-lapse microscopy automation: imaging, induction and autofocus", long_about = None)]
struct Cli {
    /// Simulate hardware latency in the mock microscope
    #[arg(long, global = true)]
    realistic: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the experiment described by a configuration file
    Run {
        /// Experiment configuration (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Experiment name, becomes part of the output directory
        #[arg(long)]
        name: String,

        /// Reuse an existing output directory
        #[arg(long)]
        overwrite: bool,
    },

    /// Acquire a z-stack around the current focus
    Zstack {
        /// Configuration providing stage limits
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Channels to acquire
        #[arg(long, required = true)]
        channels: Vec<String>,

        /// Total stack depth
        #[arg(long)]
        depth: f64,

        /// Spacing between planes
        #[arg(long)]
        step: f64,
    },

    /// Acquire an n x n tiled field around the current position
    Xyfield {
        /// Configuration providing stage limits
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Channels to acquire
        #[arg(long, required = true)]
        channels: Vec<String>,

        /// Tiles per side
        #[arg(long, default_value = "3")]
        n: usize,

        /// Spacing between tiles
        #[arg(long, default_value = "132")]
        step: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let hw = Arc::new(build_microscope(cli.realistic));

    match cli.command {
        Commands::Run {
            config,
            name,
            overwrite,
        } => run_experiment(hw, &config, &name, overwrite).await,
        Commands::Zstack {
            config,
            out,
            channels,
            depth,
            step,
        } => {
            let config = ScopeConfig::load_from(&config)?;
            let registry = PositionRegistry::new(&*hw, &config.stage).await?;
            let recorder = SessionRecorder::new(SessionLayout::new(out));
            let paths = snap_zstack(
                &*hw,
                &registry,
                &recorder,
                &channels,
                depth,
                step,
                &stack_stamp(),
            )
            .await?;
            info!(frames = paths.len(), "Z-stack complete");
            Ok(())
        }
        Commands::Xyfield {
            config,
            out,
            channels,
            n,
            step,
        } => {
            let config = ScopeConfig::load_from(&config)?;
            let registry = PositionRegistry::new(&*hw, &config.stage).await?;
            let recorder = SessionRecorder::new(SessionLayout::new(out));
            let paths = snap_xyfield(&*hw, &registry, &recorder, &channels, n, step).await?;
            info!(frames = paths.len(), "XY field complete");
            Ok(())
        }
    }
}

fn build_microscope(realistic: bool) -> MockMicroscope {
    let builder = MockMicroscope::builder()
        .resolution(1200, 1200)
        .call_log(false);
    if realistic {
        builder
            .mode(MockMode::Realistic)
            .timing(TimingConfig::microscope())
            .build()
    } else {
        builder.build()
    }
}

async fn run_experiment(
    hw: Arc<MockMicroscope>,
    config_path: &Path,
    name: &str,
    overwrite: bool,
) -> Result<()> {
    let config = ScopeConfig::load_from(config_path)
        .with_context(|| format!("Failed to load configuration {:?}", config_path))?;

    let session_dir = experiment_dir(&config.save_root, chrono::Local::now().date_naive(), name);
    if session_dir.exists() && !overwrite {
        bail!(
            "Experiment directory {:?} already exists, pass --overwrite to reuse it",
            session_dir
        );
    }
    let layout = SessionLayout::new(&session_dir);
    layout.create_root()?;
    layout.archive_file(config_path, "settings.txt")?;
    info!(dir = ?session_dir, topology = %config.topology, "Session prepared");

    warm_up_camera(&*hw, config.warmup_channel.as_deref()).await?;

    let mut registry = PositionRegistry::new(&*hw, &config.stage).await?;
    if config.topology.is_multi_position() {
        info!("Pick sites: 'a' adds the current position, 'd' removes the last one, 'q' starts the run");
        let rx = spawn_stdin_picker_feed();
        run_picker_session(&*hw, &mut registry, &config.picker_channel, rx).await?;
    }
    if registry.is_empty() {
        bail!("No sites registered");
    }

    let scheduler = Scheduler::new(hw, registry, SessionRecorder::new(layout), config.topology);
    Experiment::new(scheduler, ExperimentPlan::from_config(&config))
        .with_poll_interval(config.poll_interval())
        .with_roi_center(config.roi_center)
        .run()
        .await?;

    info!(dir = ?session_dir, "Experiment complete");
    Ok(())
}

/// Forward stdin lines as picker commands until exit or end of input.
fn spawn_stdin_picker_feed() -> mpsc::Receiver<PickerCommand> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.parse::<PickerCommand>() {
                Ok(command) => {
                    let exit = command == PickerCommand::Exit;
                    if tx.send(command).await.is_err() || exit {
                        break;
                    }
                }
                Err(err) => warn!("{}", err),
            }
        }
    });
    rx
}
