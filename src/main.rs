pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod submit;
pub mod ui;

use crate::config::{Config, ConfigStore, FileConfigStore};
use crate::corpus::Corpus;
use crate::results::{StoredResult, SummaryStats, TestRecord};
use crate::runtime::{CrosstermEventSource, Event};
use crate::session::{suppresses_key, Phase, Session};
use crate::storage::ResultsDb;
use crate::submit::{HttpResultsClient, LocalResults, ResultsBackend, SubmitOutcome};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::{mpsc::Sender, Arc, Mutex},
    thread,
};

/// terminal typing-speed test with live metrics and historical stats
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing-speed test: live wpm and accuracy while you type, results submitted to a local store or a remote results service, and historical statistics."
)]
pub struct Cli {
    /// seconds to run a time-limited test (clears a saved word target)
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// end the test after this many typed characters instead of a timer
    #[clap(short = 'w', long, conflicts_with = "seconds")]
    words: Option<u32>,

    /// base url of a remote results service; omit to keep results locally
    #[clap(short = 'b', long)]
    backend: Option<String>,

    /// user id attached to submitted results
    #[clap(short = 'u', long)]
    user: Option<i64>,

    /// override the local results database path
    #[clap(long)]
    db: Option<PathBuf>,

    /// append structured logs to this file (the terminal is busy drawing)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(secs) = self.seconds {
            cfg.seconds = secs;
            cfg.words = None;
        }
        if let Some(words) = self.words {
            cfg.words = Some(words);
        }
        if let Some(url) = &self.backend {
            cfg.backend_url = Some(url.clone());
        }
        if let Some(user) = self.user {
            cfg.user_id = Some(user);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Typing,
    Results,
    History,
}

pub struct App {
    pub settings: Config,
    pub corpus: Corpus,
    pub session: Session,
    pub backend: Arc<dyn ResultsBackend>,
    pub state: AppState,
    pub last_submit: Option<SubmitOutcome>,
    pub summary: Option<SummaryStats>,
    pub history: Vec<StoredResult>,
}

impl App {
    pub fn new(settings: Config, corpus: Corpus, backend: Arc<dyn ResultsBackend>) -> Self {
        let session = Session::new(settings.session_settings(), &corpus);
        Self {
            settings,
            corpus,
            session,
            backend,
            state: AppState::Typing,
            last_submit: None,
            summary: None,
            history: Vec::new(),
        }
    }

    /// Abandon the current attempt: back to Idle on a fresh text.
    pub fn new_test(&mut self) {
        self.session.reset(&self.corpus);
        self.last_submit = None;
        self.state = AppState::Typing;
    }

    /// Reset then start, in that order, so the fresh text from the reset is
    /// the one the new run types against.
    pub fn restart(&mut self) {
        self.session.reset(&self.corpus);
        self.session.start();
        self.last_submit = None;
        self.state = AppState::Typing;
    }

    pub fn refresh_stats(&mut self) {
        let user = self.settings.user_id;
        self.summary = self.backend.summary(user).ok();
        self.history = self.backend.recent(user).unwrap_or_default();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut settings = store.load();
    cli.apply_to(&mut settings);
    // Remember the last setup for the next run
    let _ = store.save(&settings);

    let results_backend: Arc<dyn ResultsBackend> = match &settings.backend_url {
        Some(url) => Arc::new(HttpResultsClient::new(url.clone())),
        None => {
            let db = match &cli.db {
                Some(path) => ResultsDb::at_path(path)?,
                None => ResultsDb::new()?,
            };
            Arc::new(LocalResults::new(db))
        }
    };
    let corpus = Corpus::new("english");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let mut app = App::new(settings, corpus, results_backend);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let events = CrosstermEventSource::new();
    let tx = events.sender();

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match events.recv()? {
            Event::Tick => {
                // Ticks only reach the session while a test is running; a
                // stale tick into an idle or completed session is dropped.
                if app.session.phase == Phase::Active {
                    if let Some(record) = app.session.tick() {
                        finish(app, record, &tx);
                    }
                }
            }
            Event::Resize => {}
            Event::Submitted(outcome) => {
                match &outcome {
                    SubmitOutcome::Saved(stored) => {
                        tracing::info!(id = stored.id, "result saved");
                    }
                    SubmitOutcome::Failed(msg) => {
                        tracing::warn!(%msg, "failed to save result");
                    }
                }
                app.last_submit = Some(outcome);
                app.refresh_stats();
            }
            Event::Key(key) => {
                if handle_key(app, key, &tx) == Flow::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Completion side effect: show the results screen and hand the record to
/// the backend on a worker thread. The outcome comes back as an event;
/// failure never touches the finished session.
fn finish(app: &mut App, record: TestRecord, tx: &Sender<Event>) {
    tracing::info!(
        wpm = record.wpm,
        accuracy = record.accuracy,
        mode = %record.test_mode,
        "test completed"
    );
    app.state = AppState::Results;
    app.refresh_stats();

    let backend = Arc::clone(&app.backend);
    let tx = tx.clone();
    thread::spawn(move || {
        let outcome = SubmitOutcome::from_result(backend.submit(&record));
        let _ = tx.send(Event::Submitted(outcome));
    });
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &Sender<Event>) -> Flow {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Flow::Quit;
    }

    match app.state {
        AppState::Typing => match key.code {
            KeyCode::Esc => {
                if app.session.phase == Phase::Active {
                    app.new_test();
                } else {
                    return Flow::Quit;
                }
            }
            KeyCode::Backspace => {
                if app.session.phase == Phase::Active && !app.session.typed.is_empty() {
                    let mut shorter = app.session.typed.clone();
                    shorter.pop();
                    app.session.input(&shorter);
                }
            }
            code if suppresses_key(app.session.phase, code) => {}
            KeyCode::Char(c) => {
                if app.session.phase == Phase::Idle {
                    app.session.start();
                }
                if app.session.phase == Phase::Active {
                    let mut grown = app.session.typed.clone();
                    grown.push(c);
                    if let Some(record) = app.session.input(&grown) {
                        finish(app, record, tx);
                    }
                }
            }
            _ => {}
        },
        AppState::Results => match key.code {
            KeyCode::Char('r') => app.restart(),
            KeyCode::Char('n') => app.new_test(),
            KeyCode::Char('h') => {
                app.refresh_stats();
                app.state = AppState::History;
            }
            KeyCode::Esc => return Flow::Quit,
            _ => {}
        },
        AppState::History => match key.code {
            KeyCode::Char('b') | KeyCode::Backspace => app.state = AppState::Results,
            KeyCode::Char('r') => app.restart(),
            KeyCode::Char('n') => app.new_test(),
            KeyCode::Esc => return Flow::Quit,
            _ => {}
        },
    }

    Flow::Continue
}
