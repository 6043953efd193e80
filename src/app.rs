use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::data::cli_detect;
use crate::data::error::FetchError;
use crate::data::github::{GhCli, GitHubFetcher};
use crate::data::history::ReviewHistory;
use crate::data::store::JsonFileStore;
use crate::event::AppEvent;
use crate::model::github::PullRequest;
use crate::model::review::{days_before, ActivitySummary, DayCount, ReviewEvent};

/// How many recent events the Activity tab lists.
const RECENT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveTab {
    Requests,
    Activity,
}

impl ActiveTab {
    pub const ALL: [ActiveTab; 2] = [ActiveTab::Requests, ActiveTab::Activity];
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestsPane {
    List,
    Detail,
}

/// The long-lived service object: owns the fetcher, the history store and
/// everything the UI shows.
pub struct App {
    pub should_quit: bool,
    pub active_tab: ActiveTab,
    pub show_help: bool,
    pub dirty: bool,

    pub config: Config,
    pub project_cwd: PathBuf,
    pub data_dir: PathBuf,
    pub has_gh: bool,

    fetcher: GitHubFetcher<GhCli>,
    history: ReviewHistory<JsonFileStore>,
    pub event_tx: Option<mpsc::Sender<AppEvent>>,

    // Requests tab
    pub requests: Vec<PullRequest>,
    pub request_index: usize,
    pub requests_pane: RequestsPane,
    pub detail_scroll: usize,
    pub requests_loading: bool,
    pub last_poll: Option<Instant>,
    pub new_requests: usize,

    // Activity tab
    pub activity_days: Vec<DayCount>,
    pub activity_summary: ActivitySummary,
    pub recent: Vec<ReviewEvent>,
    pub recent_index: usize,
    pub syncing: bool,
    pub last_sync: Option<String>,

    pub status_message: Option<String>,
    pub last_error: Option<String>,
}

impl App {
    pub fn new(config: Config, project_cwd: PathBuf) -> Result<Self> {
        let data_dir = config.data_dir();
        let history = ReviewHistory::new(JsonFileStore::open(&data_dir)?);
        let has_gh = cli_detect::is_available("gh");
        let last_sync = history.last_sync_date()?;

        let mut app = Self {
            should_quit: false,
            active_tab: ActiveTab::Requests,
            show_help: false,
            dirty: true,
            config,
            project_cwd,
            data_dir,
            has_gh,
            fetcher: GitHubFetcher::new(GhCli),
            history,
            event_tx: None,
            requests: Vec::new(),
            request_index: 0,
            requests_pane: RequestsPane::List,
            detail_scroll: 0,
            requests_loading: false,
            last_poll: None,
            new_requests: 0,
            activity_days: Vec::new(),
            activity_summary: ActivitySummary::default(),
            recent: Vec::new(),
            recent_index: 0,
            syncing: false,
            last_sync,
            status_message: None,
            last_error: if has_gh {
                None
            } else {
                Some("gh CLI not found on PATH".to_string())
            },
        };
        app.reload_activity();
        Ok(app)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Initial load: first poll plus the once-a-day auto sync.
    pub fn load_all(&mut self) {
        self.refresh_requests();
        self.maybe_auto_sync();
    }

    // --- Review requests ---

    /// Poll review requests on a background thread.
    pub fn refresh_requests(&mut self) {
        if !self.has_gh || self.requests_loading {
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        self.requests_loading = true;
        self.last_poll = Some(Instant::now());
        let fetcher = self.fetcher.clone();
        std::thread::spawn(move || {
            let result = fetcher.list_review_requests();
            let _ = tx.send(AppEvent::ReviewRequestsLoaded(result));
        });
    }

    pub fn handle_requests_loaded(&mut self, result: Result<Vec<PullRequest>, FetchError>) {
        self.requests_loading = false;
        match result {
            Ok(prs) => {
                match self.history.swap_request_count(prs.len()) {
                    Ok(delta) => {
                        if delta > 0 {
                            self.new_requests += delta;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to store review request count"),
                }
                info!(count = prs.len(), "review requests loaded");
                self.requests = prs;
                if self.request_index >= self.requests.len() {
                    self.request_index = self.requests.len().saturating_sub(1);
                }
                self.last_error = None;
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "review request poll failed");
                // Keep showing the last good snapshot.
                self.requests = self.fetcher.cached_review_requests();
                let hint = if e.is_auth() {
                    "a to re-authenticate"
                } else {
                    "r to retry"
                };
                self.last_error = Some(format!("{} ({})", e, hint));
            }
        }
    }

    /// Poll again once the configured interval has elapsed.
    pub fn on_tick(&mut self) {
        let interval = Duration::from_millis(self.config.refresh_interval_ms());
        let due = self.last_poll.map_or(true, |t| t.elapsed() >= interval);
        if due {
            self.refresh_requests();
        }
    }

    /// Drop the cached identity and poll again.
    pub fn reauthenticate(&mut self) {
        self.fetcher.invalidate_identity();
        self.last_error = None;
        self.status_message = Some("Re-authenticating with gh...".to_string());
        self.refresh_requests();
    }

    pub fn selected_request(&self) -> Option<&PullRequest> {
        self.requests.get(self.request_index)
    }

    pub fn selected_recent(&self) -> Option<&ReviewEvent> {
        self.recent.get(self.recent_index)
    }

    // --- History ---

    pub fn reload_activity(&mut self) {
        let end = Local::now().date_naive();
        let start = days_before(end, self.config.heatmap_days() - 1).unwrap_or(NaiveDate::MIN);
        match self.history.get_stats_for_range(start, end) {
            Ok(days) => {
                self.activity_summary = ActivitySummary::from_days(&days);
                self.activity_days = days;
            }
            Err(e) => self.last_error = Some(format!("History: {}", e)),
        }
        match self.history.recent_reviews(RECENT_LIMIT) {
            Ok(recent) => self.recent = recent,
            Err(e) => self.last_error = Some(format!("History: {}", e)),
        }
        if self.recent_index >= self.recent.len() {
            self.recent_index = self.recent.len().saturating_sub(1);
        }
    }

    fn maybe_auto_sync(&mut self) {
        if !self.config.auto_sync_on_startup() {
            return;
        }
        match self.history.needs_auto_sync(Local::now().date_naive()) {
            Ok(true) => self.start_sync(false),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "could not read last sync date"),
        }
    }

    /// Sync (or clear and resync) on a background thread. The worker opens its
    /// own handle on the same store; the UI reloads from disk when it finishes.
    pub fn start_sync(&mut self, resync: bool) {
        if !self.has_gh || self.syncing {
            return;
        }
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        self.syncing = true;
        self.status_message = Some(if resync {
            "Clearing history and resyncing...".to_string()
        } else {
            "Syncing review history...".to_string()
        });

        let fetcher = self.fetcher.clone();
        let data_dir = self.data_dir.clone();
        let days_back = self.config.sync_days_back();
        std::thread::spawn(move || {
            let result = JsonFileStore::open(&data_dir)
                .map_err(|e| e.to_string())
                .and_then(|store| {
                    let mut history = ReviewHistory::new(store);
                    let synced = if resync {
                        history.clear_and_resync(&fetcher, days_back)
                    } else {
                        history.sync_review_history(&fetcher, days_back)
                    };
                    synced.map_err(|e| e.to_string())
                });
            let _ = tx.send(AppEvent::SyncComplete { resync, result });
        });
    }

    pub fn handle_sync_complete(&mut self, resync: bool, result: Result<usize, String>) {
        self.syncing = false;
        match result {
            Ok(fetched) => {
                let verb = if resync { "Resynced" } else { "Synced" };
                self.status_message = Some(format!("{} {} reviews", verb, fetched));
                self.last_sync = self.history.last_sync_date().ok().flatten();
            }
            Err(e) => {
                warn!(error = %e, resync, "sync failed");
                self.status_message = None;
                self.last_error = Some(format!("Sync: {} (s to retry)", e));
            }
        }
        self.reload_activity();
    }

    pub fn cleanup_views(&mut self) {
        match self.history.cleanup_synthetic_views() {
            Ok(n) => self.status_message = Some(format!("Removed {} viewed markers", n)),
            Err(e) => self.last_error = Some(format!("History: {}", e)),
        }
        self.reload_activity();
    }

    /// Remove every tracked event for the selected PR (either tab).
    pub fn forget_selected(&mut self) {
        let target = match self.active_tab {
            ActiveTab::Requests => self
                .selected_request()
                .map(|pr| (pr.number, pr.repository.full_name.clone())),
            ActiveTab::Activity => self
                .selected_recent()
                .map(|e| (e.pr_number, e.repository.clone())),
        };
        let Some((number, repo)) = target else {
            return;
        };
        match self.history.remove_review_by_key(number, &repo) {
            Ok(n) => {
                self.status_message = Some(format!("Forgot {} events for {}#{}", n, repo, number))
            }
            Err(e) => self.last_error = Some(format!("History: {}", e)),
        }
        self.reload_activity();
    }

    // --- Actions on PRs ---

    /// Open the selected PR in the browser; opening a review request also
    /// records a local "viewed" event.
    pub fn open_selected(&mut self) {
        match self.active_tab {
            ActiveTab::Requests => {
                let Some(pr) = self.selected_request().cloned() else {
                    return;
                };
                if let Err(e) = cli_detect::open_url(&pr.url) {
                    self.last_error = Some(format!("Open: {}", e));
                    return;
                }
                if self.config.record_views() {
                    match self.history.record_view(&pr, Utc::now()) {
                        Ok(_) => self.reload_activity(),
                        Err(e) => self.last_error = Some(format!("History: {}", e)),
                    }
                }
            }
            ActiveTab::Activity => {
                let url = self.selected_recent().and_then(|e| e.url.clone());
                if let Some(url) = url {
                    if let Err(e) = cli_detect::open_url(&url) {
                        self.last_error = Some(format!("Open: {}", e));
                    }
                }
            }
        }
    }

    pub fn checkout_selected(&mut self) {
        if self.active_tab != ActiveTab::Requests {
            return;
        }
        let Some(pr) = self.selected_request() else {
            return;
        };
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let repo = pr.repository.full_name.clone();
        let number = pr.number;
        let cwd = self.project_cwd.clone();
        self.status_message = Some(format!("Checking out {}#{}...", repo, number));
        std::thread::spawn(move || {
            let err = cli_detect::checkout_pr(&cwd, &repo, number)
                .err()
                .map(|e| e.to_string());
            let _ = tx.send(AppEvent::CheckoutComplete(err));
        });
    }

    pub fn handle_checkout_complete(&mut self, err: Option<String>) {
        match err {
            None => self.status_message = Some("Checked out PR branch".to_string()),
            Some(e) => {
                self.status_message = None;
                self.last_error = Some(e);
            }
        }
    }

    // --- Tabs & navigation ---

    pub fn next_tab(&mut self) {
        let idx = ActiveTab::ALL
            .iter()
            .position(|t| *t == self.active_tab)
            .unwrap_or(0);
        self.switch_to_tab(ActiveTab::ALL[(idx + 1) % ActiveTab::ALL.len()]);
    }

    pub fn prev_tab(&mut self) {
        let idx = ActiveTab::ALL
            .iter()
            .position(|t| *t == self.active_tab)
            .unwrap_or(0);
        let len = ActiveTab::ALL.len();
        self.switch_to_tab(ActiveTab::ALL[(idx + len - 1) % len]);
    }

    pub fn switch_to_tab(&mut self, tab: ActiveTab) {
        if tab == ActiveTab::Requests {
            self.new_requests = 0;
        }
        self.active_tab = tab;
    }

    pub fn navigate_down(&mut self) {
        match self.active_tab {
            ActiveTab::Requests => match self.requests_pane {
                RequestsPane::List => {
                    if self.request_index + 1 < self.requests.len() {
                        self.request_index += 1;
                        self.detail_scroll = 0;
                    }
                }
                RequestsPane::Detail => {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
            },
            ActiveTab::Activity => {
                if self.recent_index + 1 < self.recent.len() {
                    self.recent_index += 1;
                }
            }
        }
    }

    pub fn navigate_up(&mut self) {
        match self.active_tab {
            ActiveTab::Requests => match self.requests_pane {
                RequestsPane::List => {
                    if self.request_index > 0 {
                        self.request_index -= 1;
                        self.detail_scroll = 0;
                    }
                }
                RequestsPane::Detail => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
            },
            ActiveTab::Activity => {
                self.recent_index = self.recent_index.saturating_sub(1);
            }
        }
    }

    pub fn navigate_left(&mut self) {
        if self.active_tab == ActiveTab::Requests {
            self.requests_pane = RequestsPane::List;
        }
    }

    pub fn navigate_right(&mut self) {
        if self.active_tab == ActiveTab::Requests && !self.requests.is_empty() {
            self.requests_pane = RequestsPane::Detail;
        }
    }

    pub fn jump_top(&mut self) {
        match self.active_tab {
            ActiveTab::Requests => match self.requests_pane {
                RequestsPane::List => {
                    self.request_index = 0;
                    self.detail_scroll = 0;
                }
                RequestsPane::Detail => self.detail_scroll = 0,
            },
            ActiveTab::Activity => self.recent_index = 0,
        }
    }

    pub fn jump_bottom(&mut self) {
        match self.active_tab {
            ActiveTab::Requests => match self.requests_pane {
                RequestsPane::List => {
                    self.request_index = self.requests.len().saturating_sub(1);
                    self.detail_scroll = 0;
                }
                RequestsPane::Detail => self.detail_scroll = usize::MAX,
            },
            ActiveTab::Activity => self.recent_index = self.recent.len().saturating_sub(1),
        }
    }
}
