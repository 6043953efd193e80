use crate::data::error::FetchError;
use crate::model::github::PullRequest;

/// Results from background workers, handled by the app loop.
#[derive(Debug)]
pub enum AppEvent {
    /// Review-request poll completed.
    ReviewRequestsLoaded(Result<Vec<PullRequest>, FetchError>),
    /// Sync (or clear-and-resync) completed: number of reviews fetched, or the failure.
    SyncComplete {
        resync: bool,
        result: Result<usize, String>,
    },
    /// `gh pr checkout` completed: None = success, Some = error message.
    CheckoutComplete(Option<String>),
}
