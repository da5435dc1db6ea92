//! ABOUTME: Entry point for the vigil motion detector
//! ABOUTME: `run` replays frames through a detection session, `report` summarizes an exported log

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use vg_config::Config;
use vg_core::{telemetry, Clock, Error, ManualClock, Result, SystemClock};
use vg_events::analytics;
use vg_notify::NotificationManager;
use vg_session::{ImageSequenceSource, MotionSession, SessionEvent, SessionExit};
use vg_vision::Annotator;

#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Motion detection and event logging")]
struct Cli {
    /// Log format: "production" for JSON, anything else for pretty output
    #[arg(long, global = true, default_value = "development")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run detection over a directory of frames
    Run(RunArgs),
    /// Print the summary report for an exported event log
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory of JPEG/PNG frames, processed in file-name order
    #[arg(long)]
    frames: PathBuf,
    /// Settings file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the event log to this CSV file when the session ends
    #[arg(long)]
    export: Option<PathBuf>,
    /// Nominal frame rate used to timestamp frames; defaults to camera.fps
    #[arg(long)]
    fps: Option<u32>,
    /// TrueType font for overlay text
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// CSV file written by `vigil run --export`
    #[arg(long)]
    events: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.env, "vigil");

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Report(args) => report(args),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(?config, "Configuration loaded successfully");

    let fps = args.fps.unwrap_or(config.camera.fps);
    if fps == 0 {
        return Err(Error::Config("--fps must be at least 1".to_string()));
    }

    // Frames are replayed, so time advances one frame interval per processed frame
    let step = chrono::Duration::microseconds(1_000_000 / fps as i64);
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::with_step(Local::now(), step));

    let annotator = match &args.font {
        Some(path) => Annotator::load_font(path)?,
        None => Annotator::new(),
    };

    let notifier = NotificationManager::from_config(&config.notifications, Arc::new(SystemClock))
        .map_err(|e| Error::Notification(e.to_string()))?;

    let source = ImageSequenceSource::open(&args.frames)?;
    if source.is_empty() {
        tracing::warn!(dir = %args.frames.display(), "No frames found");
    }

    let mut handle = MotionSession::new(
        config.session.clone(),
        config.detection_settings(),
        config.recording.clone(),
    )
    .with_clock(clock)
    .with_annotator(annotator)
    .start(Box::new(source))?;
    let log = handle.log().clone();
    let stop = handle.cancellation_token();

    let mut stopping = false;
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(SessionEvent::MotionStarted { at }) => {
                    tracing::info!(at = %vg_core::format_timestamp(at), "Motion started");
                }
                Some(SessionEvent::MotionEnded { event, snapshot }) => {
                    tracing::info!(duration_secs = event.duration, "Motion ended");
                    let outcome = notifier.notify(Some(event.duration), snapshot.as_deref()).await;
                    if outcome.permitted && !outcome.success() {
                        tracing::warn!("No notification channel delivered");
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !stopping => {
                tracing::info!("Interrupt received, stopping session");
                stop.cancel();
                stopping = true;
            }
        }
    }

    match handle.wait().await {
        SessionExit::AcquisitionFailed { failures } => {
            tracing::warn!(failures, "Session ended after repeated acquisition failures");
        }
        SessionExit::WorkerPanicked => {
            return Err(Error::External("detection worker panicked".to_string()));
        }
        exit => tracing::info!(?exit, "Session finished"),
    }

    let (events, stats) = log.snapshot();
    tracing::info!(
        total_detections = stats.total_detections,
        total_duration = stats.total_duration,
        "Session totals"
    );
    println!("{}", analytics::summary_report(&events, Local::now()));

    if let Some(path) = &args.export {
        if vg_events::export::export_to_path(&events, path)? {
            tracing::info!(path = %path.display(), events = events.len(), "Exported event log");
        } else {
            tracing::info!("No events to export");
        }
    }

    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let events = vg_events::export::import_from_path(&args.events)?;
    println!("{}", analytics::summary_report(&events, Local::now()));
    Ok(())
}
