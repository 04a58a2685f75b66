use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use facewatch_core::{
    DetectorConfig, EventStream, PumpOutcome, SessionConfig, SessionController, SessionSnapshot,
    TcpEventStream,
};
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod exporter;
mod viewer;

#[derive(Debug, Parser)]
#[command(name = "facewatch")]
#[command(about = "Live face-detection session monitor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value = "127.0.0.1:5001")]
    server: String,

    #[arg(long, default_value = "http://127.0.0.1:5000/video_feed")]
    feed_url: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    View {
        #[arg(long, default_value_t = 180.0)]
        window_sec: f64,
    },
    Config {
        #[arg(long, default_value = "rtsp://127.0.0.1:8554/stream")]
        rtsp_url: String,
        #[arg(long, default_value = "640")]
        frame_width: String,
        #[arg(long, default_value = "480")]
        frame_height: String,
        #[arg(long, default_value = "1.1")]
        scale_factor: String,
        #[arg(long, default_value = "5")]
        min_neighbors: String,
        #[arg(long, default_value = "30")]
        min_size: String,
    },
    Export {
        #[arg(long, default_value = "./data/sessions")]
        output_dir: String,
        #[arg(long, default_value_t = 90)]
        retention_days: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = SessionConfig {
        feed_url: cli.feed_url.clone(),
        ..SessionConfig::default()
    };
    let stream = TcpEventStream::new(cli.server.clone());

    match cli.command {
        Command::Run { format } | Command::Watch { format } => {
            let mut controller = SessionController::new(stream, config);
            stream_loop(&mut controller, format).await?;
        }
        Command::View { window_sec } => {
            let mut controller = SessionController::new(stream, config);
            viewer::run_viewer(&mut controller, window_sec).await?;
        }
        Command::Config {
            rtsp_url,
            frame_width,
            frame_height,
            scale_factor,
            min_neighbors,
            min_size,
        } => {
            let detector = DetectorConfig {
                rtsp_url,
                frame_width,
                frame_height,
                scale_factor,
                min_neighbors,
                min_size,
            };
            println!("{}", serde_json::to_string_pretty(&detector)?);
        }
        Command::Export {
            output_dir,
            retention_days,
        } => {
            let mut controller = SessionController::new(stream, config);
            exporter::run_exporter(&mut controller, &output_dir, retention_days).await?;
        }
    }

    Ok(())
}

async fn stream_loop<S: EventStream>(
    controller: &mut SessionController<S>,
    format: OutputFormat,
) -> Result<()> {
    controller.start().await?;
    print_snapshot(&controller.snapshot(Utc::now()), format)?;

    let mut ticker = interval(controller.config().tick_interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                controller.stop().await;
                break;
            }
            _ = ticker.tick() => {
                let snapshot = controller.snapshot(Utc::now());
                info!(uptime = %snapshot.uptime, total_faces = snapshot.total_face_count, online = controller.is_online(), "tick");
            }
            outcome = controller.pump_one() => {
                match outcome {
                    Ok(PumpOutcome::Applied) => {
                        print_snapshot(&controller.snapshot(Utc::now()), format)?;
                    }
                    Ok(PumpOutcome::Ignored) => {}
                    Ok(PumpOutcome::Closed) => {
                        warn!("event stream closed, session offline");
                        print_snapshot(&controller.snapshot(Utc::now()), format)?;
                        break;
                    }
                    Err(err) => {
                        warn!(%err, "event stream failed, session offline");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(snapshot)?);
        }
        OutputFormat::Human => {
            println!("=== Session Snapshot ===");
            println!("Time:       {}", snapshot.ts.to_rfc3339());
            println!(
                "State:      status={} uptime={} started_at={}",
                snapshot.status,
                snapshot.uptime,
                snapshot
                    .started_at
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "n/a".to_string()),
            );
            println!(
                "Faces:      total={} last_detection={} fps={}",
                snapshot.total_face_count,
                snapshot
                    .last_detection_at
                    .map(|ts| ts.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "n/a".to_string()),
                snapshot
                    .last_fps
                    .map(|fps| format!("{fps:.1}"))
                    .unwrap_or_else(|| "n/a".to_string()),
            );

            if let Some(url) = &snapshot.video_url {
                println!("Feed:       {url}");
            }
            if let Some(url) = &snapshot.snapshot_url {
                println!("Snapshot:   {url}");
            }

            if !snapshot.history.is_empty() {
                println!("Recent:");
                for entry in &snapshot.history {
                    println!("  {}  {}", entry.timestamp.format("%H:%M:%S"), entry.face_label());
                }
            }

            println!(
                "Quality:    applied={} ignored={} sessions={}",
                snapshot.stats.events_applied,
                snapshot.stats.events_ignored,
                snapshot.stats.sessions_started,
            );
        }
    }

    Ok(())
}
