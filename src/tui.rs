use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, DownloadOutcome, FetchSuccess, ProgressEvent, ProgressSink};
use crate::config::ResolvedConfig;
use crate::domain::{FormatTable, Selection, VideoUrl};
use crate::error::VidgrabError;
use crate::extractor::MediaExtractor;
use crate::output;

const EVENTS_MAX: usize = 6;
const LOGS_MAX: usize = 200;
const HINTS: &[&str] = &[
    "Tip: TAB moves between fields, Enter on the URL fetches formats",
    "Tip: Space toggles auto-download of the best format",
    "Tip: editing the URL clears the format list",
    "Tip: F1 help, F4 logs, Esc quits",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Main,
    Logs,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Url,
    Formats,
    SaveDir,
    Auto,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Url => Focus::Formats,
            Focus::Formats => Focus::SaveDir,
            Focus::SaveDir => Focus::Auto,
            Focus::Auto => Focus::Url,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Url => Focus::Auto,
            Focus::Formats => Focus::Url,
            Focus::SaveDir => Focus::Formats,
            Focus::Auto => Focus::SaveDir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resolve,
    Fetch,
    Store,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Resolve => "Resolve",
            Phase::Fetch => "Fetch",
            Phase::Store => "Store",
        }
    }
}

#[derive(Debug)]
struct AppState {
    status: String,
    phase: Phase,
    events: VecDeque<String>,
    logs: VecDeque<String>,
    view: View,
    started: Instant,
    active: bool,
    hint_index: usize,
    last_hint_update: Instant,
}

enum Work {
    Fetch(Result<FetchSuccess, VidgrabError>),
    Download(Result<DownloadOutcome, VidgrabError>),
}

struct TuiProgress {
    state: Arc<Mutex<AppState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some((phase, payload)) = parse_phase(&message) {
                state.phase = phase;
                state.status = payload.to_string();
            } else {
                state.status = message.clone();
            }
            push_bounded(&mut state.events, message.clone(), EVENTS_MAX);
            let line = match event.elapsed {
                Some(elapsed) => format!("[{}] {message} ({} ms)", timestamp(), elapsed.as_millis()),
                None => format!("[{}] {message}", timestamp()),
            };
            push_bounded(&mut state.logs, line, LOGS_MAX);
        }
    }
}

/// Interactive host: URL field, format list, save location and auto toggle.
pub struct Tui {
    state: Arc<Mutex<AppState>>,
    url: String,
    save_dir: String,
    auto: bool,
    focus: Focus,
    fetched: Option<FetchSuccess>,
    list: ListState,
    pending: Option<Receiver<Work>>,
    log_scroll: u16,
}

impl Tui {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState {
                status: "ready".to_string(),
                phase: Phase::Resolve,
                events: VecDeque::new(),
                logs: VecDeque::new(),
                view: View::Main,
                started: Instant::now(),
                active: false,
                hint_index: 0,
                last_hint_update: Instant::now(),
            })),
            url: String::new(),
            save_dir: config.save_dir.to_string(),
            auto: config.auto_best,
            focus: Focus::Url,
            fetched: None,
            list: ListState::default(),
            pending: None,
            log_scroll: 0,
        }
    }

    pub fn run<E>(&mut self, app: Arc<App<E>>) -> miette::Result<()>
    where
        E: MediaExtractor + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let result = Terminal::new(backend)
            .into_diagnostic()
            .and_then(|mut terminal| self.event_loop(&mut terminal, &app));

        disable_raw_mode().into_diagnostic()?;
        io::stdout().execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<E>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &Arc<App<E>>,
    ) -> miette::Result<()>
    where
        E: MediaExtractor + 'static,
    {
        terminal.clear().into_diagnostic()?;
        let mut tick = 0usize;
        loop {
            self.refresh_hint();
            self.poll_work();

            let state = self.snapshot_view();
            terminal
                .draw(|frame| draw_ui(frame, self, state, tick))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key, app) {
                        return Ok(());
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }
    }

    fn handle_key<E>(&mut self, key: KeyEvent, app: &Arc<App<E>>) -> bool
    where
        E: MediaExtractor + 'static,
    {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match key.code {
            KeyCode::Esc => {
                if self.view() == View::Main {
                    return true;
                }
                self.set_view(View::Main);
                return false;
            }
            KeyCode::F(1) => {
                self.toggle_view(View::Help);
                return false;
            }
            KeyCode::F(4) => {
                self.toggle_view(View::Logs);
                return false;
            }
            KeyCode::F(2) => {
                self.start_fetch(app);
                return false;
            }
            KeyCode::F(5) => {
                self.start_download(app);
                return false;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return false;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return false;
            }
            KeyCode::PageUp => {
                self.scroll_logs(5);
                return false;
            }
            KeyCode::PageDown => {
                self.scroll_logs(-5);
                return false;
            }
            _ => {}
        }

        match self.focus {
            Focus::Url => match key.code {
                KeyCode::Enter => self.start_fetch(app),
                KeyCode::Backspace => {
                    self.url.pop();
                    self.clear_formats();
                }
                KeyCode::Char(ch) => {
                    self.url.push(ch);
                    self.clear_formats();
                }
                _ => {}
            },
            Focus::Formats => match key.code {
                KeyCode::Up => self.list.select_previous(),
                KeyCode::Down => {
                    let last = self.format_count().saturating_sub(1);
                    let next = self.list.selected().map(|i| i + 1).unwrap_or(0);
                    self.list.select(Some(next.min(last)));
                }
                KeyCode::Enter => self.start_download(app),
                _ => {}
            },
            Focus::SaveDir => match key.code {
                KeyCode::Enter => self.start_download(app),
                KeyCode::Backspace => {
                    self.save_dir.pop();
                }
                KeyCode::Char(ch) => self.save_dir.push(ch),
                _ => {}
            },
            Focus::Auto => match key.code {
                KeyCode::Char(' ') => self.auto = !self.auto,
                KeyCode::Enter => self.start_download(app),
                _ => {}
            },
        }
        false
    }

    fn start_fetch<E>(&mut self, app: &Arc<App<E>>)
    where
        E: MediaExtractor + 'static,
    {
        if self.pending.is_some() {
            return;
        }
        self.clear_formats();
        let url = self.url.clone();
        let app = Arc::clone(app);
        self.set_status("Fetching video details...");
        self.spawn(move |sink| Work::Fetch(app.fetch(&url, sink)));
    }

    fn start_download<E>(&mut self, app: &Arc<App<E>>)
    where
        E: MediaExtractor + 'static,
    {
        if self.pending.is_some() {
            return;
        }
        let (formats, selection) = match &self.fetched {
            Some(fetched) => (
                fetched.formats.clone(),
                Selection::from_host(self.list.selected(), self.auto),
            ),
            None => match self.url.parse::<VideoUrl>() {
                Ok(url) => (FormatTable::auto_only(&url), Selection::Auto),
                Err(err) => {
                    self.set_status(&output::download_status(&Err(err)));
                    return;
                }
            },
        };
        let url = self.url.clone();
        let target = PathBuf::from(self.save_dir.trim());
        let app = Arc::clone(app);
        self.set_status("Downloading...");
        self.spawn(move |sink| {
            Work::Download(app.download(&url, selection, &target, &formats, sink))
        });
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn ProgressSink) -> Work + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        self.set_active(true);
        thread::spawn(move || tx.send(job(&sink)));
        self.pending = Some(rx);
    }

    fn poll_work(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };
        let work = match rx.try_recv() {
            Ok(work) => work,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.set_active(false);
                self.set_status("❌ Error: worker stopped unexpectedly");
                return;
            }
        };
        self.pending = None;
        self.set_active(false);

        match work {
            Work::Fetch(result) => {
                let status = output::fetch_status(&result);
                self.log(&status);
                if let Ok(fetched) = result {
                    self.fetched = Some(fetched);
                    self.list.select(Some(0));
                    self.focus = Focus::Formats;
                }
                self.set_status(&status);
            }
            Work::Download(result) => {
                let status = output::download_status(&result);
                self.log(&status);
                self.set_status(&status);
            }
        }
    }

    fn clear_formats(&mut self) {
        self.fetched = None;
        self.list.select(None);
    }

    fn format_count(&self) -> usize {
        self.fetched
            .as_ref()
            .map(|fetched| fetched.formats.len())
            .unwrap_or(0)
    }

    fn snapshot_view(&self) -> ViewState {
        self.state
            .lock()
            .map(|state| ViewState {
                view: state.view,
                status: state.status.clone(),
                phase: state.phase,
                active: state.active,
                elapsed: state.started.elapsed(),
                events: state.events.iter().cloned().collect(),
                logs: state.logs.iter().cloned().collect(),
                hint: HINTS[state.hint_index],
            })
            .unwrap_or_else(|_| ViewState {
                view: View::Main,
                status: "state unavailable".to_string(),
                phase: Phase::Resolve,
                active: false,
                elapsed: Duration::ZERO,
                events: Vec::new(),
                logs: Vec::new(),
                hint: HINTS[0],
            })
    }

    fn view(&self) -> View {
        self.state
            .lock()
            .map(|state| state.view)
            .unwrap_or(View::Main)
    }

    fn set_view(&self, view: View) {
        if let Ok(mut state) = self.state.lock() {
            state.view = view;
        }
    }

    fn toggle_view(&self, view: View) {
        if self.view() == view {
            self.set_view(View::Main);
        } else {
            self.set_view(view);
        }
    }

    fn set_status(&self, status: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.status = status.to_string();
        }
    }

    fn log(&self, message: &str) {
        if let Ok(mut state) = self.state.lock() {
            let line = message.replace('\n', " ");
            push_bounded(
                &mut state.logs,
                format!("[{}] {line}", timestamp()),
                LOGS_MAX,
            );
        }
    }

    fn set_active(&self, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.active = active;
            state.started = Instant::now();
            state.phase = Phase::Resolve;
        }
    }

    fn refresh_hint(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.last_hint_update.elapsed() >= Duration::from_secs(5) {
                state.hint_index = (state.hint_index + 1) % HINTS.len().max(1);
                state.last_hint_update = Instant::now();
            }
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max = self.state.lock().map(|state| state.logs.len()).unwrap_or(0);
        let max_scroll = max.saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }
}

struct ViewState {
    view: View,
    status: String,
    phase: Phase,
    active: bool,
    elapsed: Duration,
    events: Vec<String>,
    logs: Vec<String>,
    hint: &'static str,
}

fn draw_ui(frame: &mut ratatui::Frame, tui: &mut Tui, state: ViewState, tick: usize) {
    match state.view {
        View::Main => draw_main(frame, tui, &state, tick),
        View::Logs => draw_logs(frame, tui, &state, tick),
        View::Help => draw_help(frame),
    }
}

fn draw_main(frame: &mut ratatui::Frame, tui: &mut Tui, state: &ViewState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(state, tick), chunks[0]);

    let url_field = draw_field("Video URL", &tui.url, tui.focus == Focus::Url);
    frame.render_widget(url_field, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);
    draw_format_list(frame, tui, body[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(body[1]);
    frame.render_widget(draw_video_panel(tui), side[0]);
    frame.render_widget(draw_status_panel(state), side[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(30)])
        .split(chunks[3]);
    let save_field = draw_field("Save Location", &tui.save_dir, tui.focus == Focus::SaveDir);
    frame.render_widget(save_field, bottom[0]);
    frame.render_widget(draw_auto_toggle(tui), bottom[1]);

    frame.render_widget(draw_key_bar(state), chunks[4]);

    match tui.focus {
        Focus::Url => place_cursor(frame, chunks[1], &tui.url),
        Focus::SaveDir => place_cursor(frame, bottom[0], &tui.save_dir),
        _ => {}
    }
}

fn draw_header(state: &ViewState, tick: usize) -> Paragraph<'static> {
    let hb = if state.active && tick % 2 == 0 {
        "*"
    } else {
        " "
    };
    let line = Line::from(vec![
        Span::styled(
            "VIDGRAB",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   Backend: yt-dlp   Phase: "),
        Span::styled(state.phase.label(), Style::default().fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(hb, Style::default().fg(Color::Green)),
    ]);
    Paragraph::new(line)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_field<'a>(title: &'a str, value: &'a str, focused: bool) -> Paragraph<'a> {
    Paragraph::new(Line::from(value)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(focus_style(focused)),
    )
}

fn draw_format_list(frame: &mut ratatui::Frame, tui: &mut Tui, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Select Format")
        .border_style(focus_style(tui.focus == Focus::Formats));

    let items: Vec<ListItem> = match &tui.fetched {
        Some(fetched) => fetched
            .formats
            .labels()
            .map(|label| ListItem::new(label.to_string()))
            .collect(),
        None => vec![ListItem::new(Span::styled(
            "No video loaded yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut tui.list);
}

fn draw_video_panel(tui: &Tui) -> Paragraph<'static> {
    let block = Block::default().borders(Borders::ALL).title("Video Information");
    let lines = match &tui.fetched {
        Some(fetched) => fetched.summary().lines().map(summary_line).collect(),
        None => vec![Line::from(Span::styled(
            "No video loaded yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    Paragraph::new(lines).block(block).wrap(Wrap { trim: true })
}

fn summary_line(line: &str) -> Line<'static> {
    match line.split_once(": ") {
        Some((key, value)) => Line::from(vec![
            Span::styled(format!("{key}: "), Style::default().fg(Color::Gray)),
            Span::raw(value.to_string()),
        ]),
        None => Line::from(line.to_string()),
    }
}

fn draw_status_panel(state: &ViewState) -> Paragraph<'static> {
    let phase_color = if state.active {
        Color::Cyan
    } else {
        Color::Green
    };
    let mut lines: Vec<Line> = state
        .status
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    if state.active {
        lines.push(Line::from(vec![
            Span::styled("Working: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}s", state.elapsed.as_secs()),
                Style::default().fg(phase_color),
            ),
        ]));
    }
    lines.push(Line::from(""));
    for event in state.events.iter().rev().take(2) {
        lines.push(Line::from(Span::styled(
            format!("- {event}"),
            Style::default().fg(Color::DarkGray),
        )));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true })
}

fn draw_auto_toggle(tui: &Tui) -> Paragraph<'static> {
    let mark = if tui.auto { "[x]" } else { "[ ]" };
    Paragraph::new(Line::from(format!("{mark} best available"))).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Auto-download")
            .border_style(focus_style(tui.focus == Focus::Auto)),
    )
}

fn draw_key_bar(state: &ViewState) -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from(Span::styled(
            "F2 fetch  F5 download  TAB next field  F1 help  F4 logs  Esc quit",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            state.hint.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

fn draw_logs(frame: &mut ratatui::Frame, tui: &Tui, state: &ViewState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(8), Constraint::Length(1)])
        .split(frame.area());

    frame.render_widget(draw_header(state, tick), chunks[0]);
    let visible = chunks[1].height.saturating_sub(1) as usize;
    frame.render_widget(draw_logs_view(state, tui.log_scroll, visible), chunks[1]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Logs: PgUp/PgDown to scroll, Esc to go back",
            Style::default().fg(Color::Gray),
        )),
        chunks[2],
    );
}

fn draw_logs_view(state: &ViewState, scroll: u16, visible: usize) -> Paragraph<'static> {
    let total = state.logs.len();
    let start = total.saturating_sub(scroll as usize + visible);
    let mut lines = Vec::with_capacity(visible + 1);
    lines.push(Line::from(Span::styled(
        "LOGS (scrollable)",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    for line in state.logs.iter().skip(start).take(visible) {
        lines.push(Line::from(line.clone()));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_help(frame: &mut ratatui::Frame) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let lines = vec![
        Line::from("1. Paste a video URL and press Enter (or F2) to get details"),
        Line::from("2. Pick a format with Up/Down, or toggle auto-download with Space"),
        Line::from("3. Edit the save location if needed"),
        Line::from("4. Press F5 (or Enter on the list) to download"),
        Line::from(""),
        Line::from("TAB/Shift-TAB move focus   F4 logs   Esc back/quit"),
    ];
    let view = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(view, frame.area());
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn place_cursor(frame: &mut ratatui::Frame, area: Rect, value: &str) {
    let width = value.chars().count() as u16;
    let max_x = area.x.saturating_add(area.width.saturating_sub(2));
    let cursor_x = area.x.saturating_add(1).saturating_add(width).min(max_x);
    frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    if let Some(rest) = message.strip_prefix("phase=Resolve;") {
        return Some((Phase::Resolve, rest.trim()));
    }
    if let Some(rest) = message.strip_prefix("phase=Fetch;") {
        return Some((Phase::Fetch, rest.trim()));
    }
    if let Some(rest) = message.strip_prefix("phase=Store;") {
        return Some((Phase::Store, rest.trim()));
    }
    None
}

fn push_bounded(buffer: &mut VecDeque<String>, item: String, max: usize) {
    buffer.push_back(item);
    while buffer.len() > max {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
