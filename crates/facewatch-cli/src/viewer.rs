use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use facewatch_core::{EventStream, PumpOutcome, SessionController, SessionSnapshot, SessionStatus};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Paragraph};
use ratatui::Terminal;
use tokio::time::timeout;

struct MetricSeries {
    label: &'static str,
    color: Color,
    points: VecDeque<(f64, f64)>,
}

impl MetricSeries {
    fn new(label: &'static str, color: Color) -> Self {
        Self {
            label,
            color,
            points: VecDeque::new(),
        }
    }

    fn push(&mut self, x: f64, y: f64, window_sec: f64) {
        self.points.push_back((x, y));
        while let Some((old_x, _)) = self.points.front() {
            if x - old_x > window_sec {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    fn bounds(&self) -> [f64; 2] {
        if self.points.is_empty() {
            return [0.0, 1.0];
        }
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for (_, y) in &self.points {
            min = min.min(*y);
            max = max.max(*y);
        }
        // Both series are non-negative; never let padding drag the axis below zero.
        if (max - min).abs() < f64::EPSILON {
            [(min - 1.0).max(0.0), max + 1.0]
        } else {
            let pad = (max - min) * 0.12;
            [(min - pad).max(0.0), max + pad]
        }
    }
}

struct ViewerState {
    start: Instant,
    fps_series: MetricSeries,
    faces_series: MetricSeries,
    last_error: Option<String>,
}

impl ViewerState {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            fps_series: MetricSeries::new("FPS", Color::Cyan),
            faces_series: MetricSeries::new("Faces / report", Color::Green),
            last_error: None,
        }
    }

    fn record(&mut self, snapshot: &SessionSnapshot, window_sec: f64) {
        let t = self.start.elapsed().as_secs_f64();
        if let Some(fps) = snapshot.last_fps {
            self.fps_series.push(t, fps, window_sec);
        }
        if let Some(entry) = snapshot.history.first() {
            self.faces_series.push(t, entry.face_count as f64, window_sec);
        }
    }
}

pub async fn run_viewer<S: EventStream>(
    controller: &mut SessionController<S>,
    window_sec: f64,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = ViewerState::new();
    let mut command_buffer = String::new();

    let run_result = async {
        loop {
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Char('s') => match controller.start().await {
                            Ok(()) => state.last_error = None,
                            Err(err) => state.last_error = Some(err.to_string()),
                        },
                        KeyCode::Char('x') => controller.stop().await,
                        KeyCode::Char('r') => controller.reset(),
                        KeyCode::Char(c) => {
                            command_buffer.push(c.to_ascii_lowercase());
                            if command_buffer.len() > 8 {
                                let drain = command_buffer.len() - 8;
                                command_buffer.drain(0..drain);
                            }
                            if command_buffer.ends_with("exit") {
                                break;
                            }
                        }
                        KeyCode::Backspace => {
                            command_buffer.pop();
                        }
                        _ => {}
                    }
                }
            }

            drain_events(controller, &mut state, window_sec).await;

            let snapshot = controller.snapshot(Utc::now());
            terminal.draw(|frame| draw_ui(frame.size(), frame, &snapshot, &state, window_sec))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

async fn drain_events<S: EventStream>(
    controller: &mut SessionController<S>,
    state: &mut ViewerState,
    window_sec: f64,
) {
    if !controller.is_online() {
        return;
    }

    loop {
        match timeout(Duration::from_millis(5), controller.pump_one()).await {
            Ok(Ok(PumpOutcome::Applied)) => {
                let snapshot = controller.snapshot(Utc::now());
                state.record(&snapshot, window_sec);
            }
            Ok(Ok(PumpOutcome::Ignored)) => {}
            Ok(Ok(PumpOutcome::Closed)) => {
                state.last_error = Some("event stream closed".to_string());
                break;
            }
            Ok(Err(err)) => {
                state.last_error = Some(err.to_string());
                break;
            }
            Err(_) => break,
        }
    }
}

fn draw_ui(
    area: Rect,
    frame: &mut ratatui::Frame<'_>,
    snapshot: &SessionSnapshot,
    state: &ViewerState,
    window_sec: f64,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let header = render_header(snapshot, state, window_sec);
    frame.render_widget(header, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    let activity = render_activity(snapshot);
    frame.render_widget(activity, cols[0]);

    let chart_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[1]);

    let now_sec = state.start.elapsed().as_secs_f64();
    render_metric_chart(frame, chart_rows[0], &state.fps_series, now_sec, window_sec);
    render_metric_chart(frame, chart_rows[1], &state.faces_series, now_sec, window_sec);
}

fn render_header(
    snapshot: &SessionSnapshot,
    state: &ViewerState,
    window_sec: f64,
) -> Paragraph<'static> {
    let status_color = match snapshot.status {
        SessionStatus::Online => Color::Green,
        SessionStatus::Offline => Color::Red,
    };

    let summary = format!(
        "uptime={}  total_faces={}  fps={}  last_detection={}",
        snapshot.uptime,
        snapshot.total_face_count,
        snapshot
            .last_fps
            .map(|fps| format!("{fps:.1}"))
            .unwrap_or_else(|| "n/a".to_string()),
        snapshot
            .last_detection_at
            .map(|ts| ts.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "n/a".to_string()),
    );

    let feed = format!(
        "feed={}  window={}s  (s=start x=stop r=reset q=quit)",
        snapshot.video_url.as_deref().unwrap_or("-"),
        window_sec as u64
    );

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                "Facewatch  ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{}  ", snapshot.status),
                Style::default().fg(status_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(summary),
        ]),
        Line::from(feed),
    ];

    if let Some(err) = &state.last_error {
        lines.push(Line::from(Span::styled(
            format!("stream: {err}"),
            Style::default().fg(Color::Red),
        )));
    }

    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"))
}

fn render_activity(snapshot: &SessionSnapshot) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if snapshot.history.is_empty() {
        lines.push(Line::from("No detections yet..."));
    } else {
        for entry in &snapshot.history {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}  ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(entry.face_label()),
            ]));
        }
    }

    Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Recent Detections"),
    )
}

fn render_metric_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    series: &MetricSeries,
    now_sec: f64,
    window_sec: f64,
) {
    let points: Vec<(f64, f64)> = series.points.iter().copied().collect();

    let x_min = (now_sec - window_sec).max(0.0);
    let x_max = now_sec.max(window_sec);
    let y_bounds = series.bounds();

    let dataset = Dataset::default()
        .name(series.label)
        .marker(symbols::Marker::Braille)
        .graph_type(ratatui::widgets::GraphType::Line)
        .style(Style::default().fg(series.color))
        .data(&points);

    let x_mid = (x_min + x_max) / 2.0;

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(series.label))
        .x_axis(
            Axis::default()
                .title("time (s)")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(format!("{x_min:.0}")),
                    Span::raw(format!("{x_mid:.0}")),
                    Span::raw(format!("{x_max:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("value")
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.1}", y_bounds[0])),
                    Span::raw(format!("{:.1}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.1}", y_bounds[1])),
                ]),
        );

    frame.render_widget(chart, area);
}
