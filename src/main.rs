mod app;
mod config;
mod data;
mod event;
mod model;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use crossterm::event::{self as ct_event, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use crate::app::{ActiveTab, App};
use crate::config::Config;
use crate::data::github::{GhCli, GitHubFetcher};
use crate::data::history::ReviewHistory;
use crate::data::store::JsonFileStore;
use crate::event::AppEvent;
use crate::model::review::{days_before, ActivitySummary};

#[derive(Parser)]
#[command(
    name = "revq",
    version,
    about = "revq - GitHub review queue and review activity tracker",
    override_help = HELP_TEXT,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (defaults to ~/.revq/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Repository checkout used by `c` (defaults to current directory)
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print open review requests and exit
    Requests,
    /// Pull completed reviews into the local history
    Sync {
        /// Lookback window in days [default: sync.days_back or 90]
        #[arg(long)]
        days: Option<u32>,
    },
    /// Erase the local history, then sync
    Resync {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Print the review heatmap and totals
    Stats {
        /// Days to show, at most 3660 [default: display.heatmap_days or 182]
        #[arg(long)]
        days: Option<u32>,
    },
    /// Remove all locally recorded "viewed" events
    CleanupViews,
    /// Remove every tracked event for one PR
    Forget {
        /// Repository as owner/name
        repo: String,
        /// PR number
        number: u64,
    },
}

const HELP_TEXT: &str = "\
revq - GitHub review queue and review activity tracker

USAGE:
  revq [OPTIONS]                    Start the TUI dashboard
  revq requests                     Print open review requests
  revq sync [--days N]              Pull completed reviews into local history
  revq resync [--days N]            Erase local history, then sync
  revq stats [--days N]             Print review heatmap and totals
  revq cleanup-views                Remove locally recorded \"viewed\" events
  revq forget <OWNER/NAME> <N>      Remove every tracked event for one PR

Requires the GitHub CLI (gh) on PATH, authenticated with `gh auth login`.

GLOBAL OPTIONS:
  --config <FILE>   Config file [default: ~/.revq/config.toml]
  --cwd <DIR>       Repository checkout used by `c` [default: current dir]
  -h, --help        Print this help
  -V, --version     Print version

TUI KEYBINDINGS:
  1-2 / Tab          Switch tabs (Requests, Activity)
  j/k  Up/Down       Navigate list / scroll detail
  h/l  Left/Right    Switch panes (Requests)
  g / G              Jump to top / bottom
  o / Enter          Open PR in browser (records a view)
  c                  Check out PR branch
  r                  Refresh review requests
  s                  Sync review history
  R                  Clear history and resync
  x                  Remove all viewed markers
  d                  Forget tracked events for selected PR
  a                  Re-authenticate with gh
  ?                  Toggle help overlay
  q / Ctrl+C         Quit

LOGGING:
  Logs go to <data_dir>/revq.log. RUST_LOG overrides log.level.

EXAMPLES:
  revq --cwd ~/src/myproject
  revq sync --days 30
  revq forget octo/widgets 42";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let cfg = config::load_config(&config_path)?;
    init_logging(&cfg)?;

    match cli.command {
        None => {
            let project_cwd = resolve_cwd(cli.cwd)?;
            run_tui(cfg, project_cwd)
        }
        Some(Command::Requests) => print_requests(),
        Some(Command::Sync { days }) => {
            let days = days.unwrap_or_else(|| cfg.sync_days_back());
            let mut history = open_history(&cfg)?;
            let fetched = history.sync_review_history(&GitHubFetcher::new(GhCli), days)?;
            println!("Synced {} reviews from the last {} days", fetched, days);
            Ok(())
        }
        Some(Command::Resync { days }) => {
            let days = days.unwrap_or_else(|| cfg.sync_days_back());
            let mut history = open_history(&cfg)?;
            let fetched = history.clear_and_resync(&GitHubFetcher::new(GhCli), days)?;
            println!("Cleared history and resynced {} reviews", fetched);
            Ok(())
        }
        Some(Command::Stats { days }) => {
            let days = days.unwrap_or_else(|| cfg.heatmap_days());
            print_stats(&cfg, days.clamp(1, config::MAX_HEATMAP_DAYS))
        }
        Some(Command::CleanupViews) => {
            let removed = open_history(&cfg)?.cleanup_synthetic_views()?;
            println!("Removed {} viewed markers", removed);
            Ok(())
        }
        Some(Command::Forget { repo, number }) => {
            let removed = open_history(&cfg)?.remove_review_by_key(number, &repo)?;
            println!("Removed {} events for {}#{}", removed, repo, number);
            Ok(())
        }
    }
}

/// File logging under the data dir; the terminal belongs to the TUI.
fn init_logging(cfg: &Config) -> Result<()> {
    let dir = cfg.data_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(config::LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg.log_level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn resolve_cwd(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(p) => {
            let canonical = std::fs::canonicalize(&p)
                .with_context(|| format!("resolving {}", p.display()))?;
            // canonicalize returns \\?\C:\... on Windows, which git tooling dislikes.
            let s = canonical.to_string_lossy();
            match s.strip_prefix(r"\\?\") {
                Some(rest) => Ok(PathBuf::from(rest)),
                None => Ok(canonical),
            }
        }
        None => Ok(std::env::current_dir()?),
    }
}

fn open_history(cfg: &Config) -> Result<ReviewHistory<JsonFileStore>> {
    let dir = cfg.data_dir();
    let store = JsonFileStore::open(&dir)
        .with_context(|| format!("opening history in {}", dir.display()))?;
    Ok(ReviewHistory::new(store))
}

fn print_requests() -> Result<()> {
    let prs = GitHubFetcher::new(GhCli).list_review_requests()?;
    if prs.is_empty() {
        println!("Nothing waiting for your review");
        return Ok(());
    }
    for pr in &prs {
        println!(
            "[{:>2}] {:<40} {} (by {}, updated {})",
            pr.size_label(),
            pr.reference(),
            pr.title,
            pr.author.login,
            pr.updated_at.get(..10).unwrap_or(pr.updated_at.as_str()),
        );
    }
    Ok(())
}

fn print_stats(cfg: &Config, days: u32) -> Result<()> {
    let history = open_history(cfg)?;
    let end = Local::now().date_naive();
    let start = days_before(end, days - 1).unwrap_or(NaiveDate::MIN);
    let range = history.get_stats_for_range(start, end)?;
    let total = history.get_total_review_count(start, end)?;
    let summary = ActivitySummary::from_days(&range);

    for line in ui::activity_view::heatmap_lines(&range, 4 + 2 * 53) {
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        println!("{}", text.trim_end());
    }
    println!();
    println!("Reviews ({} to {}): {}", start, end, total);
    println!("Active days: {}", summary.active_days);
    println!(
        "Current streak: {}  Longest: {}",
        summary.current_streak, summary.longest_streak
    );
    if let Some(b) = summary.busiest {
        println!("Busiest day: {} ({})", b.date, b.count);
    }
    let recent = history.recent_reviews(5)?;
    if !recent.is_empty() {
        println!();
        println!("Recent:");
        for e in &recent {
            println!(
                "  {} {:<17} {}#{} {}",
                e.reviewed_at.get(..10).unwrap_or(e.reviewed_at.as_str()),
                e.state.label(),
                e.repository,
                e.pr_number,
                e.pr_title
            );
        }
    }
    match history.last_sync_date()? {
        Some(d) => println!("Last sync: {}", d),
        None => println!("Last sync: never (run `revq sync`)"),
    }
    Ok(())
}

fn run_tui(cfg: Config, project_cwd: PathBuf) -> Result<()> {
    let app = App::new(cfg, project_cwd)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "dashboard exited with error");
        eprintln!("Error: {}", e);
    }
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    // Channel first so the initial loaders can report back
    let (tx, rx) = mpsc::channel::<AppEvent>();
    app.event_tx = Some(tx);
    app.load_all();

    let tick_rate = Duration::from_millis(app.config.tick_rate());
    let mut last_tick = Instant::now();

    loop {
        // Draw only when dirty
        if app.dirty {
            terminal.draw(|f| ui::draw(f, &app))?;
            app.dirty = false;
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if ct_event::poll(timeout)? {
            match ct_event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut app, key);
                    app.mark_dirty();
                }
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }

        // Results from background workers
        while let Ok(evt) = rx.try_recv() {
            match evt {
                AppEvent::ReviewRequestsLoaded(result) => app.handle_requests_loaded(result),
                AppEvent::SyncComplete { resync, result } => {
                    app.handle_sync_complete(resync, result)
                }
                AppEvent::CheckoutComplete(err) => app.handle_checkout_complete(err),
            }
            app.mark_dirty();
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            let was_loading = app.requests_loading;
            app.on_tick();
            if app.requests_loading != was_loading {
                app.mark_dirty();
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keybindings (always active)
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        _ => {}
    }

    // Don't process other keys when help is showing
    if app.show_help {
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Tab switching
        KeyCode::Tab => app.next_tab(),
        KeyCode::BackTab => app.prev_tab(),
        KeyCode::Char('1') => app.switch_to_tab(ActiveTab::Requests),
        KeyCode::Char('2') => app.switch_to_tab(ActiveTab::Activity),

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.navigate_down(),
        KeyCode::Char('k') | KeyCode::Up => app.navigate_up(),
        KeyCode::Char('h') | KeyCode::Left => app.navigate_left(),
        KeyCode::Char('l') | KeyCode::Right => app.navigate_right(),
        KeyCode::Char('g') => app.jump_top(),
        KeyCode::Char('G') => app.jump_bottom(),

        // PR actions
        KeyCode::Char('o') | KeyCode::Enter => app.open_selected(),
        KeyCode::Char('c') => app.checkout_selected(),
        KeyCode::Char('r') => app.refresh_requests(),
        KeyCode::Char('a') => app.reauthenticate(),

        // History
        KeyCode::Char('s') => app.start_sync(false),
        KeyCode::Char('R') => app.start_sync(true),
        KeyCode::Char('x') => app.cleanup_views(),
        KeyCode::Char('d') | KeyCode::Delete => app.forget_selected(),

        _ => {}
    }
}
