use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use facewatch_core::{EventStream, PumpOutcome, SessionController, SessionSnapshot};
use tracing::warn;

pub async fn run_exporter<S: EventStream>(
    controller: &mut SessionController<S>,
    output_dir: &str,
    retention_days: u64,
) -> Result<()> {
    let out_dir = PathBuf::from(output_dir);
    fs::create_dir_all(&out_dir)?;

    let mut state = ExportState::new(out_dir, retention_days)?;

    controller.start().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                controller.stop().await;
                break;
            }
            outcome = controller.pump_one() => {
                match outcome {
                    Ok(PumpOutcome::Applied) => {
                        let snapshot = controller.snapshot(Utc::now());
                        state.write_snapshot(&snapshot)?;
                        state.maybe_prune()?;
                    }
                    Ok(PumpOutcome::Ignored) => {}
                    Ok(PumpOutcome::Closed) => {
                        warn!("event stream closed, stopping export");
                        break;
                    }
                    Err(err) => {
                        warn!(%err, "event stream failed, stopping export");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

struct ExportState {
    out_dir: PathBuf,
    retention_days: u64,
    current_day: String,
    writer: BufWriter<File>,
    last_prune: Instant,
}

impl ExportState {
    fn new(out_dir: PathBuf, retention_days: u64) -> Result<Self> {
        let now = Utc::now();
        let day = now.format("%Y-%m-%d").to_string();
        let writer = Self::open_writer(&out_dir, &day)?;

        Ok(Self {
            out_dir,
            retention_days,
            current_day: day,
            writer,
            last_prune: Instant::now() - Duration::from_secs(3600),
        })
    }

    fn open_writer(out_dir: &Path, day: &str) -> Result<BufWriter<File>> {
        let path = out_dir.join(format!("facewatch-{day}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn rotate_if_needed(&mut self, ts: DateTime<Utc>) -> Result<()> {
        let day = ts.format("%Y-%m-%d").to_string();
        if day != self.current_day {
            self.writer.flush()?;
            self.writer = Self::open_writer(&self.out_dir, &day)?;
            self.current_day = day;
        }
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        self.rotate_if_needed(snapshot.ts)?;

        let exported = serde_json::json!({
            "ts": snapshot.ts,
            "unix_ms": snapshot.ts.timestamp_millis(),
            "status": snapshot.status,
            "uptime": snapshot.uptime,
            "total_face_count": snapshot.total_face_count,
            "last_detection_at": snapshot.last_detection_at,
            "last_fps": snapshot.last_fps,
            "snapshot_url": snapshot.snapshot_url,
            "history": snapshot.history,
            "stats": snapshot.stats,
        });

        serde_json::to_writer(&mut self.writer, &exported)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        let latest_path = self.out_dir.join("latest.json");
        fs::write(latest_path, serde_json::to_vec_pretty(&exported)?)?;

        Ok(())
    }

    fn maybe_prune(&mut self) -> Result<()> {
        if self.last_prune.elapsed() < Duration::from_secs(1800) {
            return Ok(());
        }
        self.last_prune = Instant::now();

        prune_old_log_files(&self.out_dir, self.retention_days, SystemTime::now())?;

        Ok(())
    }
}

pub(crate) fn prune_old_log_files(out_dir: &Path, retention_days: u64, now: SystemTime) -> Result<()> {
    let today = DateTime::<Utc>::from(now).date_naive();
    let cutoff = today
        .checked_sub_days(Days::new(retention_days))
        .unwrap_or(today);

    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path
            .file_name()
            .and_then(|v| v.to_str())
            .map(|n| n.starts_with("facewatch-") && n.ends_with(".jsonl"))
            .unwrap_or(false)
        {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        let Some(date_part) = file_name
            .strip_prefix("facewatch-")
            .and_then(|v| v.strip_suffix(".jsonl"))
        else {
            continue;
        };

        let Ok(file_date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            continue;
        };

        if file_date < cutoff {
            let _ = fs::remove_file(path);
        }
    }

    Ok(())
}
