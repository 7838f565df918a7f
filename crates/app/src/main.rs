use std::{path::PathBuf, sync::Arc};

use analog_clock_core::{AnalogClock, ClockConfig, ClockError, HostScope, SizeConfig};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn main() -> analog_clock_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { clock, output } => run_render(&clock, &output),
        Commands::Run {
            clock,
            ticks,
            frames,
        } => run_live(&clock, ticks, frames.as_deref()),
    }
}

/// Draws a single frame of the clock and writes it as a PNG.
fn run_render(options: &ClockOptions, output: &PathBuf) -> analog_clock_core::Result<()> {
    let (mut clock, size) = build_clock(options)?;
    let runtime = current_thread_runtime()?;

    runtime.block_on(async {
        let scope = HostScope::current()?;
        clock.attach_to(Arc::new(scope.clone()))?;
        tracing::info!(
            zone = clock.zone_id(),
            time = ?clock.clock_state(),
            ?output,
            "rendering frame"
        );

        let frame = clock.render(size.width, size.height);
        clock.detach();
        scope.close();
        frame.save(output)?;
        Ok::<_, ClockError>(())
    })
}

/// Attaches the clock to a live runtime and follows it for `ticks` seconds.
fn run_live(
    options: &ClockOptions,
    ticks: u32,
    frames: Option<&std::path::Path>,
) -> analog_clock_core::Result<()> {
    let (clock, size) = build_clock(options)?;
    let runtime = current_thread_runtime()?;

    if let Some(dir) = frames {
        std::fs::create_dir_all(dir)?;
    }

    runtime.block_on(async move {
        let (redraw_tx, mut redraw_rx) = mpsc::unbounded_channel();
        let mut clock = clock.with_redraw_hook(Arc::new(move || {
            let _ = redraw_tx.send(());
        }));

        let scope = HostScope::current()?;
        clock.attach_to(Arc::new(scope.clone()))?;
        tracing::info!(zone = clock.zone_id(), ticks, "clock attached");
        // the attach itself requests a redraw; only count ticks
        let _ = redraw_rx.try_recv();

        let mut seen = 0;
        while seen < ticks {
            if redraw_rx.recv().await.is_none() {
                break;
            }
            let Some(state) = clock.clock_state() else {
                continue;
            };
            seen += 1;
            tracing::info!(tick = seen, time = %state, "tick");

            if let Some(dir) = frames {
                let path = dir.join(format!("frame-{seen:04}.png"));
                clock.render(size.width, size.height).save(&path)?;
                tracing::debug!(?path, "frame written");
            }
        }

        clock.detach();
        scope.close();
        tracing::info!("clock detached");
        Ok::<_, ClockError>(())
    })
}

fn build_clock(options: &ClockOptions) -> analog_clock_core::Result<(AnalogClock, SizeConfig)> {
    let mut config = match &options.config {
        Some(path) => ClockConfig::load(path)?,
        None => ClockConfig::default(),
    };
    if let Some(zone) = &options.zone {
        config.zone_id = Some(zone.clone());
    }
    if let Some(size) = options.size {
        config.size = SizeConfig {
            width: size,
            height: size,
        };
    }

    let size = config.size;
    let clock = AnalogClock::new(config.into_component_config()?);
    if let Some(fallback) = clock.zone_fallback() {
        tracing::warn!(
            requested = %fallback.requested,
            shown = clock.zone_id(),
            "unknown time zone, showing system time"
        );
    }
    Ok((clock, size))
}

fn current_thread_runtime() -> analog_clock_core::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(ClockError::from)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Self-updating analog clock", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the current time once and save it as a PNG image.
    Render {
        #[command(flatten)]
        clock: ClockOptions,
        /// Destination PNG path.
        output: PathBuf,
    },
    /// Keep the clock running and report every tick.
    Run {
        #[command(flatten)]
        clock: ClockOptions,
        /// Number of ticks to follow before detaching.
        #[arg(short, long, default_value_t = 5)]
        ticks: u32,
        /// Directory that receives one PNG frame per tick.
        #[arg(long)]
        frames: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ClockOptions {
    /// Time zone id such as `Europe/Paris`; defaults to the system zone.
    #[arg(short, long)]
    zone: Option<String>,
    /// JSON configuration file with assets and tints.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Square frame size in pixels, overriding the configuration.
    #[arg(short, long)]
    size: Option<u32>,
}
