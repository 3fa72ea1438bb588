use crate::client::SimulationParams;
use crate::playback::{EngineState, PlaybackConfig, PlaybackEngine};
use crate::trace::{Basis, Bit, Role, Trace};
use axum::serve;
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color as TuiColor, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine},
        Block, Borders, Paragraph, Widget,
    },
    Terminal,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use tokio::{net::TcpListener, runtime::Runtime, sync::oneshot};

const LOG_LIMIT: usize = 64;
const FRAME_INTERVAL_MS: u64 = 33;
const ROW_WINDOW: usize = 12;
const KEY_DISPLAY_LIMIT: usize = 60;
// Positions served to the browser are percentages of the channel span.
const WEB_CHANNEL_SPAN: f64 = 100.0;
const LOOP_BANNER_TEXT: &str = "LOOP END";
const CLASSICAL_CHANNEL_TEXT: &str = "Exchange information to get the sifted key";
const WEB_INDEX_HTML: &str = include_str!("web/index.html");

#[derive(Clone, Debug, Serialize)]
pub struct TraceSummary {
    pub step_count: usize,
    pub interceptor_present: bool,
    pub matching_bases_count: u32,
    pub qber_percent: f64,
    pub sifted_key: String,
    pub sifted_bits: usize,
    pub params: Option<SimulationParams>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlaybackSnapshot {
    pub state: String,
    pub current_step: usize,
    pub step_count: usize,
    pub step_progress: f64,
    pub loop_banner_visible: bool,
    pub dwell_remaining_ms: f64,
    pub channel_width: f64,
    pub cycles_completed: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepRow {
    pub index: usize,
    pub current: bool,
    pub alice_basis: String,
    pub alice_bit: String,
    pub eve_basis: String,
    pub eve_bit: String,
    pub bob_basis: String,
    pub bob_bit: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PhotonView {
    pub role: String,
    pub glyph: String,
    pub position: f64,
    pub fraction: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplayData {
    pub summary: Option<TraceSummary>,
    pub playback: PlaybackSnapshot,
    pub rows: Vec<StepRow>,
    pub photons: Vec<PhotonView>,
    pub logs: VecDeque<String>,
}

impl TraceSummary {
    pub fn from_trace(trace: &Trace, params: Option<&SimulationParams>) -> Self {
        let mut sifted_key: String = trace
            .sifted_key()
            .iter()
            .take(KEY_DISPLAY_LIMIT)
            .map(|bit| if bit.to_u8() == 1 { '1' } else { '0' })
            .collect();
        if trace.sifted_key().len() > KEY_DISPLAY_LIMIT {
            sifted_key.push('…');
        }
        TraceSummary {
            step_count: trace.step_count(),
            interceptor_present: trace.has_interceptor(),
            matching_bases_count: trace.matching_bases_count(),
            qber_percent: trace.error_rate() * 100.0,
            sifted_key,
            sifted_bits: trace.sifted_key().len(),
            params: params.cloned(),
        }
    }
}

impl PlaybackSnapshot {
    pub fn from_engine(engine: &PlaybackEngine, cycles_completed: u64) -> Self {
        PlaybackSnapshot {
            state: engine.state().label().to_string(),
            current_step: engine.current_step(),
            step_count: engine.step_count(),
            step_progress: engine.step_progress(),
            loop_banner_visible: engine.loop_banner_visible(),
            dwell_remaining_ms: engine.dwell_remaining_ms(),
            channel_width: engine.channel_width(),
            cycles_completed,
        }
    }
}

impl StepRow {
    fn from_trace(trace: &Trace, index: usize, current: bool) -> Self {
        let cell = |role: Role| {
            (
                basis_symbol(trace.basis(role, index)).to_string(),
                bit_symbol(trace.basis(role, index), trace.bit(role, index)).to_string(),
            )
        };
        let (alice_basis, alice_bit) = cell(Role::Alice);
        let (eve_basis, eve_bit) = cell(Role::Eve);
        let (bob_basis, bob_bit) = cell(Role::Bob);
        StepRow {
            index,
            current,
            alice_basis,
            alice_bit,
            eve_basis,
            eve_bit,
            bob_basis,
            bob_bit,
        }
    }
}

impl ReplayData {
    pub fn capture(
        engine: &PlaybackEngine,
        params: Option<&SimulationParams>,
        logs: &VecDeque<String>,
        cycles_completed: u64,
    ) -> Self {
        let summary = engine
            .trace()
            .map(|trace| TraceSummary::from_trace(trace, params));
        let rows = engine
            .trace()
            .map(|trace| step_rows(trace, engine.current_step()))
            .unwrap_or_default();
        let width = engine.channel_width();
        let photons = engine
            .photon_poses()
            .into_iter()
            .map(|pose| {
                let glyph = engine
                    .trace()
                    .map(|trace| {
                        bit_symbol(
                            trace.basis(pose.role, engine.current_step()),
                            trace.bit(pose.role, engine.current_step()),
                        )
                    })
                    .unwrap_or('·');
                PhotonView {
                    role: pose.role.label().to_string(),
                    glyph: glyph.to_string(),
                    position: pose.position,
                    fraction: if width > 0.0 { pose.position / width } else { 0.0 },
                }
            })
            .collect();
        ReplayData {
            summary,
            playback: PlaybackSnapshot::from_engine(engine, cycles_completed),
            rows,
            photons,
            logs: logs.clone(),
        }
    }
}

fn step_rows(trace: &Trace, current_step: usize) -> Vec<StepRow> {
    let count = trace.step_count();
    if count == 0 {
        return Vec::new();
    }
    let window = ROW_WINDOW.min(count);
    let focus = current_step.min(count - 1);
    let start = focus.saturating_sub(window / 2).min(count - window);
    (start..start + window)
        .map(|index| StepRow::from_trace(trace, index, index == current_step))
        .collect()
}

/// Basis marker the station cards use: `+` rectilinear, `x` diagonal.
pub fn basis_symbol(basis: Option<Basis>) -> char {
    match basis {
        Some(Basis::Rectilinear) => '+',
        Some(Basis::Diagonal) => 'x',
        None => '·',
    }
}

/// Polarization glyph for a measured bit, `·` for an undetected photon.
pub fn bit_symbol(basis: Option<Basis>, bit: Option<Bit>) -> char {
    match (basis, bit) {
        (Some(Basis::Rectilinear), Some(Bit::Zero)) => '-',
        (Some(Basis::Rectilinear), Some(Bit::One)) => '|',
        (Some(Basis::Diagonal), Some(Bit::Zero)) => '/',
        (Some(Basis::Diagonal), Some(Bit::One)) => '\\',
        _ => '·',
    }
}

fn role_color(role: &str) -> TuiColor {
    match role {
        "Alice" => TuiColor::Yellow,
        "Eve" => TuiColor::Red,
        "Bob" => TuiColor::Cyan,
        _ => TuiColor::White,
    }
}

pub struct ReplayVisualizer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    engine: PlaybackEngine,
    trace: Trace,
    params: Option<SimulationParams>,
    logs: VecDeque<String>,
    cycles_completed: u64,
    finished: bool,
}

impl ReplayVisualizer {
    pub fn for_trace(
        trace: Trace,
        params: Option<SimulationParams>,
        config: PlaybackConfig,
    ) -> io::Result<Self> {
        let mut engine = PlaybackEngine::new(config);
        engine
            .load(trace.clone())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

        let mut stdout = io::stdout();
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let mut visualizer = Self {
            terminal,
            engine,
            trace,
            params,
            logs: VecDeque::with_capacity(LOG_LIMIT),
            cycles_completed: 0,
            finished: false,
        };
        visualizer.note(format!(
            "trace loaded: {} steps, interceptor {}",
            visualizer.trace.step_count(),
            if visualizer.trace.has_interceptor() {
                "present"
            } else {
                "absent"
            }
        ));
        visualizer.note("space pauses and resumes, r restarts, q quits");
        Ok(visualizer)
    }

    /// Drives the replay until the user quits. The engine only advances by
    /// the deltas fed here, so pausing is literally a matter of not calling
    /// tick with wall time while frozen.
    pub fn run(&mut self) -> io::Result<()> {
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            let delta_ms = now.duration_since(last).as_secs_f64() * 1000.0;
            last = now;

            let banner_before = self.engine.loop_banner_visible();
            self.engine.tick(delta_ms);
            if !banner_before && self.engine.loop_banner_visible() {
                self.cycles_completed += 1;
                self.note(format!("cycle {} complete", self.cycles_completed));
            }

            self.render()?;

            if event::poll(Duration::from_millis(FRAME_INTERVAL_MS))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => break,
                        KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Char('P') => {
                            self.toggle_pause();
                        }
                        KeyCode::Char('r') | KeyCode::Char('R') => self.restart(),
                        _ => {}
                    }
                }
            }
        }
        self.finish()
    }

    fn toggle_pause(&mut self) {
        let outcome = match self.engine.state() {
            EngineState::Running => self.engine.pause().map(|()| "playback paused"),
            EngineState::Paused => self.engine.resume().map(|()| "playback resumed"),
            _ => {
                self.note("pause is unavailable while the loop banner is up");
                return;
            }
        };
        match outcome {
            Ok(message) => self.note(message),
            Err(err) => self.note(err.to_string()),
        }
    }

    fn restart(&mut self) {
        self.engine.reset();
        match self.engine.load(self.trace.clone()) {
            Ok(()) => self.note("playback restarted from step 0"),
            Err(err) => self.note(format!("restart failed: {err}")),
        }
    }

    fn note<S: Into<String>>(&mut self, entry: S) {
        push_log(&mut self.logs, entry.into());
    }

    fn render(&mut self) -> io::Result<()> {
        // The channel span has to be known before drawing, the same way the
        // browser version measures the channel div before animating into it.
        let size = self.terminal.size()?;
        self.engine
            .set_channel_width(f64::from(size.width.saturating_sub(6)));
        let data = ReplayData::capture(
            &self.engine,
            self.params.as_ref(),
            &self.logs,
            self.cycles_completed,
        );

        self.terminal.draw(|frame| {
            let size = frame.size();
            let vertical = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(8),
                    Constraint::Length(9),
                    Constraint::Min(10),
                ])
                .split(size);

            let header_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(vertical[0]);

            let bottom_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(6),
                    Constraint::Length(5),
                    Constraint::Min(3),
                ])
                .split(vertical[2]);

            frame.render_widget(Self::summary_block(&data), header_chunks[0]);
            frame.render_widget(Self::playback_block(&data), header_chunks[1]);
            frame.render_widget(Self::channel_canvas(&data), vertical[1]);
            frame.render_widget(Self::exchange_block(&data), bottom_chunks[0]);
            frame.render_widget(Self::classical_block(&data), bottom_chunks[1]);
            frame.render_widget(Self::log_block(&data), bottom_chunks[2]);
        })?;
        Ok(())
    }

    fn summary_block(data: &ReplayData) -> Paragraph<'_> {
        let mut lines = Vec::new();
        if let Some(summary) = &data.summary {
            lines.push(Line::from(format!("steps: {}", summary.step_count)));
            lines.push(Line::from(format!(
                "interceptor: {}",
                if summary.interceptor_present {
                    "present"
                } else {
                    "absent"
                }
            )));
            lines.push(Line::from(format!(
                "matching bases: {}",
                summary.matching_bases_count
            )));
            lines.push(Line::from(format!("QBER: {:.2}%", summary.qber_percent)));
            if let Some(params) = &summary.params {
                lines.push(Line::from(format!(
                    "qubits: {}  detector eff: {:.2}",
                    params.bit_count, params.detector_efficiency
                )));
                lines.push(Line::from(format!(
                    "perturb: {:.2}  fiber: {:.1} km",
                    params.perturb_probability, params.fiber_length
                )));
            }
        } else {
            lines.push(Line::from("no trace loaded"));
        }
        Paragraph::new(lines).block(Block::default().title("Exchange").borders(Borders::ALL))
    }

    fn playback_block(data: &ReplayData) -> Paragraph<'_> {
        let p = &data.playback;
        let mut lines = Vec::new();
        lines.push(Line::from(Span::styled(
            p.state.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if p.loop_banner_visible {
            lines.push(Line::from(format!(
                "restart in {:.1}s",
                p.dwell_remaining_ms / 1000.0
            )));
        } else {
            lines.push(Line::from(format!(
                "step: {}/{}",
                (p.current_step + 1).min(p.step_count),
                p.step_count
            )));
            lines.push(Line::from(format!(
                "progress: {:>3.0}%",
                p.step_progress * 100.0
            )));
        }
        lines.push(Line::from(format!("cycles: {}", p.cycles_completed)));
        Paragraph::new(lines).block(Block::default().title("Playback").borders(Borders::ALL))
    }

    fn channel_canvas(data: &ReplayData) -> impl Widget + '_ {
        let width = data.playback.channel_width.max(1.0);
        let interceptor = data
            .summary
            .as_ref()
            .map(|summary| summary.interceptor_present)
            .unwrap_or(false);
        let banner = data.playback.loop_banner_visible;
        let photons = data.photons.clone();
        Canvas::default()
            .block(
                Block::default()
                    .title("Quantum channel")
                    .borders(Borders::ALL),
            )
            .x_bounds([-2.0, width + 2.0])
            .y_bounds([0.0, 3.0])
            .paint(move |ctx: &mut Context<'_>| {
                ctx.draw(&CanvasLine {
                    x1: 0.0,
                    y1: 1.5,
                    x2: width,
                    y2: 1.5,
                    color: TuiColor::DarkGray,
                });
                ctx.print(
                    0.0,
                    2.4,
                    Span::styled("Alice", Style::default().fg(TuiColor::Yellow)),
                );
                if interceptor {
                    ctx.print(
                        width / 2.0,
                        2.4,
                        Span::styled("Eve", Style::default().fg(TuiColor::Red)),
                    );
                }
                ctx.print(
                    width,
                    2.4,
                    Span::styled("Bob", Style::default().fg(TuiColor::Cyan)),
                );
                for photon in &photons {
                    ctx.print(
                        photon.position,
                        1.5,
                        Span::styled(
                            photon.glyph.clone(),
                            Style::default()
                                .fg(role_color(&photon.role))
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }
                if banner {
                    ctx.print(
                        width / 2.0,
                        0.6,
                        Span::styled(
                            LOOP_BANNER_TEXT,
                            Style::default()
                                .fg(TuiColor::Magenta)
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            })
    }

    fn exchange_block(data: &ReplayData) -> Paragraph<'_> {
        if data.rows.is_empty() {
            return Paragraph::new(vec![Line::from("no steps to show")])
                .block(Block::default().title("Steps").borders(Borders::ALL));
        }
        let highlight = Style::default().add_modifier(Modifier::REVERSED);
        let mut index_spans = vec![Span::raw("step  ")];
        let mut alice_spans = vec![Span::raw("Alice ")];
        let mut eve_spans = vec![Span::raw("Eve   ")];
        let mut bob_spans = vec![Span::raw("Bob   ")];
        for row in &data.rows {
            let style = if row.current {
                highlight
            } else {
                Style::default()
            };
            index_spans.push(Span::styled(format!("{:>4}", row.index), style));
            alice_spans.push(Span::styled(
                format!("  {}{}", row.alice_basis, row.alice_bit),
                style.fg(TuiColor::Yellow),
            ));
            eve_spans.push(Span::styled(
                format!("  {}{}", row.eve_basis, row.eve_bit),
                style.fg(TuiColor::Red),
            ));
            bob_spans.push(Span::styled(
                format!("  {}{}", row.bob_basis, row.bob_bit),
                style.fg(TuiColor::Cyan),
            ));
        }
        let lines = vec![
            Line::from(index_spans),
            Line::from(alice_spans),
            Line::from(eve_spans),
            Line::from(bob_spans),
        ];
        Paragraph::new(lines).block(Block::default().title("Steps").borders(Borders::ALL))
    }

    fn classical_block(data: &ReplayData) -> Paragraph<'_> {
        let mut lines = Vec::new();
        lines.push(Line::from(CLASSICAL_CHANNEL_TEXT));
        if let Some(summary) = &data.summary {
            lines.push(Line::from(format!(
                "sifted key ({} bits): {}",
                summary.sifted_bits, summary.sifted_key
            )));
        }
        Paragraph::new(lines).block(
            Block::default()
                .title("Classical channel")
                .borders(Borders::ALL),
        )
    }

    fn log_block(data: &ReplayData) -> Paragraph<'_> {
        let mut lines: Vec<Line> = data
            .logs
            .iter()
            .rev()
            .map(|entry| Line::from(entry.as_str()))
            .collect();
        if lines.is_empty() {
            lines.push(Line::from("logs will appear here"));
        }
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title("Live log (newest first)")
                    .borders(Borders::ALL),
            )
            .style(Style::default().fg(TuiColor::Gray))
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.restore_terminal()
    }

    fn restore_terminal(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for ReplayVisualizer {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

pub struct WebReplayVisualizer {
    data: Arc<RwLock<ReplayData>>,
    engine: PlaybackEngine,
    params: Option<SimulationParams>,
    logs: VecDeque<String>,
    cycles_completed: u64,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_thread: Option<thread::JoinHandle<()>>,
    address: SocketAddr,
    finished: bool,
}

impl WebReplayVisualizer {
    pub fn for_trace(
        trace: Trace,
        params: Option<SimulationParams>,
        config: PlaybackConfig,
        port: u16,
    ) -> io::Result<Self> {
        let mut engine = PlaybackEngine::new(config);
        engine
            .load(trace)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        engine.set_channel_width(WEB_CHANNEL_SPAN);

        let mut logs = VecDeque::with_capacity(LOG_LIMIT);
        push_log(&mut logs, "replay dashboard started".to_string());
        let data = ReplayData::capture(&engine, params.as_ref(), &logs, 0);

        let shared = Arc::new(RwLock::new(data));
        let (server_thread, shutdown_tx, address) = spawn_web_server(shared.clone(), port)?;

        Ok(Self {
            data: shared,
            engine,
            params,
            logs,
            cycles_completed: 0,
            shutdown_tx: Some(shutdown_tx),
            server_thread: Some(server_thread),
            address,
            finished: false,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Ticks the replay and publishes snapshots until the user presses
    /// Enter. The browser polls `/snapshot`; nothing in the page can mutate
    /// playback, so the engine stays single-owner on this thread.
    pub fn run(&mut self) -> io::Result<()> {
        println!("Replay dashboard running at {}", self.base_url());
        println!("Press Enter once you're done to shut down the server.");

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let waiter = thread::spawn(move || {
            let mut buffer = String::new();
            let _ = io::stdin().read_line(&mut buffer);
            stop_flag.store(true, Ordering::SeqCst);
        });

        let mut last = Instant::now();
        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            let delta_ms = now.duration_since(last).as_secs_f64() * 1000.0;
            last = now;

            let banner_before = self.engine.loop_banner_visible();
            self.engine.tick(delta_ms);
            if !banner_before && self.engine.loop_banner_visible() {
                self.cycles_completed += 1;
                push_log(
                    &mut self.logs,
                    format!("cycle {} complete", self.cycles_completed),
                );
            }

            let data = ReplayData::capture(
                &self.engine,
                self.params.as_ref(),
                &self.logs,
                self.cycles_completed,
            );
            self.publish(data)?;
            thread::sleep(Duration::from_millis(FRAME_INTERVAL_MS));
        }
        let _ = waiter.join();
        self.finish()
    }

    fn publish(&self, data: ReplayData) -> io::Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "replay dashboard state poisoned"))?;
        *guard = data;
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.shutdown_server();
        self.finished = true;
        Ok(())
    }

    fn shutdown_server(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WebReplayVisualizer {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[derive(Clone)]
struct WebAppState {
    data: Arc<RwLock<ReplayData>>,
}

fn spawn_web_server(
    state: Arc<RwLock<ReplayData>>,
    port: u16,
) -> io::Result<(thread::JoinHandle<()>, oneshot::Sender<()>, SocketAddr)> {
    let (ready_tx, ready_rx) = mpsc::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = thread::spawn(move || {
        let runtime = Runtime::new().expect("failed to start tokio runtime for replay dashboard");
        let app_state = WebAppState { data: state };
        runtime.block_on(async move {
            let app = Router::new()
                .route("/", get(index_handler))
                .route("/snapshot", get(snapshot_handler))
                .with_state(app_state);

            let bind_addr = SocketAddr::from(([127, 0, 0, 1], port));
            let listener = TcpListener::bind(bind_addr)
                .await
                .expect("failed to bind replay dashboard port");
            let addr = listener.local_addr().expect("dashboard listener addr");
            let _ = ready_tx.send(addr);

            let server = serve(listener, app);
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };

            if let Err(err) = server.with_graceful_shutdown(shutdown).await {
                eprintln!("replay dashboard server exited with error: {err}");
            }
        });
    });

    let address = ready_rx
        .recv()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "replay dashboard failed to start"))?;

    Ok((handle, shutdown_tx, address))
}

async fn index_handler() -> impl IntoResponse {
    Html(WEB_INDEX_HTML)
}

async fn snapshot_handler(State(state): State<WebAppState>) -> impl IntoResponse {
    let snapshot = {
        let guard = state.data.read().expect("replay dashboard state poisoned");
        guard.clone()
    };
    Json(snapshot)
}

fn push_log(logs: &mut VecDeque<String>, entry: String) {
    if logs.len() == LOG_LIMIT {
        logs.pop_front();
    }
    logs.push_back(entry);
}
