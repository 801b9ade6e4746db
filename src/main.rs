use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use rand::rngs::ThreadRng;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

use formcast::report::{PredictionReport, ReportSource, default_report_path};
use formcast::state::{AppState, source_label};

struct App {
    state: AppState,
    rng: ThreadRng,
    should_quit: bool,
    reload_every: Duration,
    last_reload: Instant,
}

impl App {
    fn new(report_path: PathBuf) -> Self {
        let reload_every = std::env::var("REPORT_POLL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(30)
            .max(5);
        let mut state = AppState::new(report_path);
        state.reload_report();
        Self {
            state,
            rng: rand::thread_rng(),
            should_quit: false,
            reload_every: Duration::from_secs(reload_every),
            last_reload: Instant::now(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => {
                self.state.push_log("[INFO] Manual reload requested");
                self.state.reload_report();
            }
            KeyCode::Char('p') => self.state.toggle_placeholder(&mut self.rng),
            _ => {}
        }
    }

    fn maybe_reload(&mut self) {
        if self.last_reload.elapsed() >= self.reload_every {
            self.state.reload_report();
            self.last_reload = Instant::now();
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let report_path = std::env::var("FORMCAST_REPORT")
        .ok()
        .map(PathBuf::from)
        .or_else(default_report_path)
        .unwrap_or_else(|| PathBuf::from("prediction.json"));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(report_path);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        app.maybe_reload();

        let report = app.state.display_report(&mut app.rng);
        terminal.draw(|f| ui(f, app, &report))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App, report: &PredictionReport) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(report))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_prediction(frame, chunks[1], report);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer =
        Paragraph::new("r Reload | p Placeholder | q Quit").block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);
}

fn header_text(report: &PredictionReport) -> String {
    let line1 = format!(
        "  .-.  FORMCAST | {} vs {} | {}",
        report.home,
        report.away,
        source_label(report.source)
    );
    let line2 = format!(" /___\\ generated {}", report.generated_at);
    let line3 = "  |_|".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn render_prediction(frame: &mut Frame, area: Rect, report: &PredictionReport) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(32),
            Constraint::Percentage(34),
        ])
        .split(rows[0]);

    render_outcome_panel(frame, columns[0], &report.home, "Home", report.p_home);
    render_outcome_panel(frame, columns[1], "Draw", "", report.p_draw);
    render_outcome_panel(frame, columns[2], &report.away, "Away", report.p_away);

    let bar = win_prob_bar(report);
    frame.render_widget(
        bar.block(Block::default().title("Win probability").borders(Borders::ALL)),
        rows[1],
    );

    let verdict_style = match report.source {
        ReportSource::Computed => Style::default().fg(Color::Green),
        ReportSource::Simulated => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    };
    let verdict = format!(
        "{} | Predicted Winner: {} ({:.1}%)",
        source_label(report.source),
        report.winner_label(),
        report.winning_pct()
    );
    frame.render_widget(
        Paragraph::new(verdict)
            .style(verdict_style)
            .block(Block::default().title("Prediction").borders(Borders::ALL)),
        rows[2],
    );
}

fn render_outcome_panel(frame: &mut Frame, area: Rect, name: &str, side: &str, pct: f64) {
    let title = if side.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({side})")
    };
    let body = format!("\n{pct:.1}%");
    frame.render_widget(
        Paragraph::new(body)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn win_prob_bar(report: &PredictionReport) -> BarChart<'_> {
    let home = Bar::default()
        .value(report.p_home.round() as u64)
        .text_value(String::new())
        .style(Style::default().fg(Color::Green));
    let draw = Bar::default()
        .value(report.p_draw.round() as u64)
        .text_value(String::new())
        .style(Style::default().fg(Color::Gray));
    let away = Bar::default()
        .value(report.p_away.round() as u64)
        .text_value(String::new())
        .style(Style::default().fg(Color::Red));

    BarChart::default()
        .data(BarGroup::default().bars(&[home, draw, away]))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No log lines yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(5)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}
