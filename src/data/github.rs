//! Review-request and completed-review fetching over the GitHub REST API.

use std::process::{Child, Command, Output, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::data::error::FetchError;
use crate::data::history::ReviewSource;
use crate::model::github::{
    GhReview, GhUser, PullDetail, PullRequest, Repository, SearchItem, SearchResponse,
};
use crate::model::review::{ReviewEvent, ReviewOutcome, DATE_FORMAT};

const PER_PAGE: usize = 100;
/// The search API stops at 1000 results.
const MAX_PAGES: usize = 10;

/// Authenticated GET against the REST API, returning the raw JSON body.
pub trait GhTransport: Send + Sync {
    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<u8>, FetchError>;
}

/// Transport backed by `gh api`, which owns the credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct GhCli;

impl GhTransport for GhCli {
    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
        let mut args = vec![
            "api".to_string(),
            "-X".to_string(),
            "GET".to_string(),
            endpoint.to_string(),
        ];
        for (key, value) in params {
            args.push("-f".to_string());
            args.push(format!("{}={}", key, value));
        }
        run_gh(&args)
    }
}

/// Run a gh command, returning stdout on success.
fn run_gh(args: &[String]) -> Result<Vec<u8>, FetchError> {
    let mut child = Command::new("gh")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                FetchError::Transport("gh not found on PATH".to_string())
            }
            _ => FetchError::Transport(format!("failed to run gh: {}", e)),
        })?;

    let output =
        wait_with_output(&mut child).map_err(|e| FetchError::Transport(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::from_gh_stderr(&stderr));
    }
    Ok(output.stdout)
}

/// Wait for a child process while concurrently draining its stdout and stderr
/// pipes, so a child writing more than the pipe buffer can't block forever.
fn wait_with_output(child: &mut Child) -> std::io::Result<Output> {
    use std::io::Read;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stdout_pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    });

    let status = child.wait()?;
    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn lock<V>(m: &Mutex<V>) -> MutexGuard<'_, V> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fetches review requests and completed reviews for the authenticated user.
///
/// Cheap to clone; clones share the cached identity and the last review-request
/// snapshot.
#[derive(Clone)]
pub struct GitHubFetcher<T> {
    transport: T,
    identity: Arc<Mutex<Option<String>>>,
    last_requests: Arc<Mutex<Vec<PullRequest>>>,
}

impl<T: GhTransport> GitHubFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            identity: Arc::new(Mutex::new(None)),
            last_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn call<D: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<D, FetchError> {
        match self.transport.get(endpoint, params) {
            Ok(body) => Ok(serde_json::from_slice(&body)?),
            Err(e) => {
                if let FetchError::AuthExpired(_) = e {
                    warn!(endpoint, "credential rejected, dropping cached identity");
                    self.invalidate_identity();
                }
                Err(e)
            }
        }
    }

    /// Login of the authenticated user, cached after the first lookup.
    pub fn current_user(&self) -> Result<String, FetchError> {
        if let Some(login) = lock(&self.identity).clone() {
            return Ok(login);
        }
        let user: GhUser = self.call("user", &[])?;
        if user.login.is_empty() {
            return Err(FetchError::NotAuthenticated);
        }
        debug!(login = %user.login, "resolved GitHub identity");
        *lock(&self.identity) = Some(user.login.clone());
        Ok(user.login)
    }

    /// Forget the cached identity so the next call re-authenticates.
    pub fn invalidate_identity(&self) {
        *lock(&self.identity) = None;
    }

    /// Issue search, most recently updated first, following pages until a
    /// short page or the API's result cap.
    fn search(&self, query: &str) -> Result<Vec<SearchItem>, FetchError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let params = [
                ("q", query.to_string()),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let resp: SearchResponse = self.call("search/issues", &params)?;
            let got = resp.items.len();
            items.extend(resp.items);
            if got < PER_PAGE || items.len() as u64 >= resp.total_count {
                break;
            }
        }
        Ok(items)
    }

    /// Every review on a PR, oldest first, following pages until a short one.
    fn reviews(&self, full_name: &str, number: u64) -> Result<Vec<GhReview>, FetchError> {
        let endpoint = format!("repos/{}/pulls/{}/reviews", full_name, number);
        let mut reviews = Vec::new();
        for page in 1..=MAX_PAGES {
            let params = [
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let batch: Vec<GhReview> = self.call(&endpoint, &params)?;
            let got = batch.len();
            reviews.extend(batch);
            if got < PER_PAGE {
                break;
            }
        }
        Ok(reviews)
    }

    /// Open, non-draft PRs where the user is a requested reviewer.
    ///
    /// A PR whose detail can't be fetched is kept with summary fields only.
    /// The result replaces the cached snapshot.
    pub fn list_review_requests(&self) -> Result<Vec<PullRequest>, FetchError> {
        let me = self.current_user()?;
        let query = format!("is:pr is:open review-requested:{}", me);
        let items = self.search(&query)?;

        let mut prs = Vec::with_capacity(items.len());
        for item in &items {
            let Some(full_name) = item.repo_full_name() else {
                warn!(url = %item.repository_url, "skipping search hit with unknown repository");
                continue;
            };
            let endpoint = format!("repos/{}/pulls/{}", full_name, item.number);
            let detail = match self.call::<PullDetail>(&endpoint, &[]) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(pr = %format!("{}#{}", full_name, item.number), error = %e,
                        "PR detail unavailable, using summary fields");
                    None
                }
            };
            prs.push(PullRequest::assemble(
                item,
                Repository::from_full_name(&full_name),
                detail.as_ref(),
            ));
        }

        prs.retain(|pr| !pr.is_draft);
        prs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        *lock(&self.last_requests) = prs.clone();
        Ok(prs)
    }

    /// The result of the last successful `list_review_requests`.
    pub fn cached_review_requests(&self) -> Vec<PullRequest> {
        lock(&self.last_requests).clone()
    }

    /// Reviews the user submitted on PRs updated on or after `since`.
    ///
    /// PRs the user authored never contribute. A PR whose review list can't be
    /// fetched is skipped.
    pub fn list_completed_reviews(&self, since: NaiveDate) -> Result<Vec<ReviewEvent>, FetchError> {
        let me = self.current_user()?;
        let query = format!(
            "is:pr reviewed-by:{} updated:>={}",
            me,
            since.format(DATE_FORMAT)
        );
        let items = self.search(&query)?;

        let mut events = Vec::new();
        for item in &items {
            if item.user.login.eq_ignore_ascii_case(&me) {
                debug!(pr = item.number, "skipping self-authored PR");
                continue;
            }
            let Some(full_name) = item.repo_full_name() else {
                warn!(url = %item.repository_url, "skipping search hit with unknown repository");
                continue;
            };
            let reviews = match self.reviews(&full_name, item.number) {
                Ok(r) => r,
                Err(e) => {
                    warn!(pr = %format!("{}#{}", full_name, item.number), error = %e,
                        "review list unavailable, skipping PR");
                    continue;
                }
            };
            events.extend(review_events(item, &full_name, &me, reviews));
        }
        Ok(events)
    }
}

/// One event per submitted review by `me`.
fn review_events(
    item: &SearchItem,
    full_name: &str,
    me: &str,
    reviews: Vec<GhReview>,
) -> Vec<ReviewEvent> {
    reviews
        .into_iter()
        .filter(|r| {
            r.user
                .as_ref()
                .is_some_and(|u| u.login.eq_ignore_ascii_case(me))
        })
        .filter_map(|r| {
            let submitted_at = r.submitted_at?;
            let Some(state) = ReviewOutcome::from_api_state(&r.state) else {
                debug!(review = r.id, state = %r.state, "ignoring review state");
                return None;
            };
            Some(ReviewEvent {
                pr_id: item.id,
                pr_title: item.title.clone(),
                pr_number: item.number,
                repository: full_name.to_string(),
                reviewed_at: submitted_at,
                state,
                url: Some(r.html_url.unwrap_or_else(|| item.html_url.clone())),
            })
        })
        .collect()
}

impl<T: GhTransport> ReviewSource for GitHubFetcher<T> {
    fn completed_reviews_since(&self, since: NaiveDate) -> Result<Vec<ReviewEvent>, FetchError> {
        self.list_completed_reviews(since)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    /// Scripted transport keyed by endpoint, plus `?q=<query>` for searches and
    /// `#page=<n>` for pages after the first.
    #[derive(Default)]
    struct FakeTransport {
        responses: HashMap<String, Result<String, FetchError>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn ok(mut self, key: &str, body: serde_json::Value) -> Self {
            self.responses.insert(key.to_string(), Ok(body.to_string()));
            self
        }

        fn err(mut self, key: &str, e: FetchError) -> Self {
            self.responses.insert(key.to_string(), Err(e));
            self
        }

        fn calls(&self) -> Vec<String> {
            lock(&self.calls).clone()
        }
    }

    impl GhTransport for FakeTransport {
        fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
            let mut key = match params.iter().find(|(k, _)| *k == "q") {
                Some((_, q)) => format!("{}?q={}", endpoint, q),
                None => endpoint.to_string(),
            };
            if let Some((_, page)) = params.iter().find(|(k, _)| *k == "page") {
                if page != "1" {
                    key.push_str(&format!("#page={}", page));
                }
            }
            lock(&self.calls).push(key.clone());
            match self.responses.get(&key) {
                Some(Ok(body)) => Ok(body.clone().into_bytes()),
                Some(Err(e)) => Err(e.clone()),
                None => Err(FetchError::Transport(format!("HTTP 404: {}", key))),
            }
        }
    }

    fn hit(id: u64, number: u64, repo: &str, author: &str, updated: &str) -> serde_json::Value {
        json!({
            "id": id,
            "number": number,
            "title": format!("PR {}", number),
            "html_url": format!("https://github.com/{}/pull/{}", repo, number),
            "repository_url": format!("https://api.github.com/repos/{}", repo),
            "user": { "login": author, "avatar_url": "" },
            "state": "open",
            "comments": 1,
            "labels": [],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": updated
        })
    }

    fn search(items: Vec<serde_json::Value>) -> serde_json::Value {
        json!({ "total_count": items.len(), "items": items })
    }

    fn detail(draft: bool, additions: u64) -> serde_json::Value {
        json!({
            "draft": draft,
            "additions": additions,
            "deletions": 1,
            "comments": 2,
            "review_comments": 5,
            "requested_reviewers": [{ "login": "me" }]
        })
    }

    fn review(id: u64, login: &str, state: &str, submitted: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "user": { "login": login },
            "state": state,
            "submitted_at": submitted,
            "html_url": format!("https://github.com/r/{}", id)
        })
    }

    const REQUESTED: &str = "search/issues?q=is:pr is:open review-requested:me";
    const REVIEWED: &str = "search/issues?q=is:pr reviewed-by:me updated:>=2024-01-01";

    fn since() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn review_requests_exclude_drafts() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REQUESTED,
                search(vec![
                    hit(1, 10, "acme/a", "alice", "2024-02-03T00:00:00Z"),
                    hit(2, 11, "acme/a", "bob", "2024-02-02T00:00:00Z"),
                    hit(3, 12, "acme/b", "carol", "2024-02-01T00:00:00Z"),
                ]),
            )
            .ok("repos/acme/a/pulls/10", detail(false, 10))
            .ok("repos/acme/a/pulls/11", detail(true, 10))
            .ok("repos/acme/b/pulls/12", detail(false, 400));
        let fetcher = GitHubFetcher::new(transport);

        let prs = fetcher.list_review_requests().unwrap();
        let numbers: Vec<u64> = prs.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![10, 12]);
        assert_eq!(prs[1].size_label(), "L");
        assert_eq!(prs[0].review_comments, 5);
        assert_eq!(fetcher.cached_review_requests(), prs);
    }

    #[test]
    fn review_request_detail_failure_degrades() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REQUESTED,
                search(vec![hit(1, 10, "acme/a", "alice", "2024-02-03T00:00:00Z")]),
            )
            .err(
                "repos/acme/a/pulls/10",
                FetchError::Transport("HTTP 502".to_string()),
            );
        let fetcher = GitHubFetcher::new(transport);

        let prs = fetcher.list_review_requests().unwrap();
        assert_eq!(prs.len(), 1);
        assert!(!prs[0].is_draft);
        assert_eq!(prs[0].additions, 0);
        assert_eq!(prs[0].deletions, 0);
        assert_eq!(prs[0].comments, 1);
    }

    #[test]
    fn review_requests_sorted_by_update() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REQUESTED,
                search(vec![
                    hit(1, 10, "acme/a", "alice", "2024-02-01T00:00:00Z"),
                    hit(2, 11, "acme/a", "bob", "2024-02-05T00:00:00Z"),
                ]),
            )
            .ok("repos/acme/a/pulls/10", detail(false, 1))
            .ok("repos/acme/a/pulls/11", detail(false, 1));
        let prs = GitHubFetcher::new(transport).list_review_requests().unwrap();
        assert_eq!(prs[0].number, 11);
    }

    #[test]
    fn search_failure_fails_the_batch_and_keeps_snapshot() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .err(REQUESTED, FetchError::Transport("HTTP 500".to_string()));
        let fetcher = GitHubFetcher::new(transport);
        let err = fetcher.list_review_requests().unwrap_err();
        assert_eq!(err, FetchError::Transport("HTTP 500".to_string()));
        assert!(fetcher.cached_review_requests().is_empty());
    }

    #[test]
    fn completed_reviews_skip_self_authored() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REVIEWED,
                search(vec![
                    hit(1, 10, "acme/a", "Me", "2024-02-03T00:00:00Z"),
                    hit(2, 11, "acme/a", "bob", "2024-02-02T00:00:00Z"),
                ]),
            )
            .ok(
                "repos/acme/a/pulls/10/reviews",
                json!([review(100, "me", "APPROVED", Some("2024-02-03T10:00:00Z"))]),
            )
            .ok(
                "repos/acme/a/pulls/11/reviews",
                json!([review(101, "me", "COMMENTED", Some("2024-02-02T10:00:00Z"))]),
            );
        let fetcher = GitHubFetcher::new(transport);

        let events = fetcher.list_completed_reviews(since()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pr_number, 11);
        assert!(!fetcher
            .transport
            .calls()
            .contains(&"repos/acme/a/pulls/10/reviews".to_string()));
    }

    #[test]
    fn completed_reviews_only_mine_and_submitted() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REVIEWED,
                search(vec![hit(7, 11, "acme/a", "bob", "2024-02-02T00:00:00Z")]),
            )
            .ok(
                "repos/acme/a/pulls/11/reviews",
                json!([
                    review(1, "me", "COMMENTED", Some("2024-02-01T09:00:00Z")),
                    review(2, "someone", "APPROVED", Some("2024-02-01T10:00:00Z")),
                    review(3, "me", "PENDING", None),
                    review(4, "me", "DISMISSED", Some("2024-02-01T11:00:00Z")),
                    review(5, "me", "CHANGES_REQUESTED", Some("2024-02-02T09:00:00Z")),
                ]),
            );
        let events = GitHubFetcher::new(transport)
            .list_completed_reviews(since())
            .unwrap();

        let got: Vec<(ReviewOutcome, &str)> = events
            .iter()
            .map(|e| (e.state, e.reviewed_at.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (ReviewOutcome::Commented, "2024-02-01T09:00:00Z"),
                (ReviewOutcome::ChangesRequested, "2024-02-02T09:00:00Z"),
            ]
        );
        assert!(events.iter().all(|e| e.pr_id == 7 && e.repository == "acme/a"));
        assert_eq!(events[0].url.as_deref(), Some("https://github.com/r/1"));
    }

    #[test]
    fn completed_reviews_follow_review_pages() {
        let first_page: Vec<serde_json::Value> = (0..PER_PAGE as u64)
            .map(|i| review(i, "someone", "COMMENTED", Some("2024-02-01T09:00:00Z")))
            .collect();
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REVIEWED,
                search(vec![hit(7, 11, "acme/a", "bob", "2024-02-02T00:00:00Z")]),
            )
            .ok("repos/acme/a/pulls/11/reviews", json!(first_page))
            .ok(
                "repos/acme/a/pulls/11/reviews#page=2",
                json!([review(500, "me", "APPROVED", Some("2024-02-02T09:00:00Z"))]),
            );
        let fetcher = GitHubFetcher::new(transport);

        let events = fetcher.list_completed_reviews(since()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].state, ReviewOutcome::Approved);
        assert!(!fetcher
            .transport
            .calls()
            .contains(&"repos/acme/a/pulls/11/reviews#page=3".to_string()));
    }

    #[test]
    fn completed_reviews_skip_failing_pr() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .ok(
                REVIEWED,
                search(vec![
                    hit(1, 10, "acme/a", "bob", "2024-02-03T00:00:00Z"),
                    hit(2, 11, "acme/a", "bob", "2024-02-02T00:00:00Z"),
                ]),
            )
            .err(
                "repos/acme/a/pulls/10/reviews",
                FetchError::Transport("HTTP 502".to_string()),
            )
            .ok(
                "repos/acme/a/pulls/11/reviews",
                json!([review(5, "me", "APPROVED", Some("2024-02-02T09:00:00Z"))]),
            );
        let events = GitHubFetcher::new(transport)
            .list_completed_reviews(since())
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pr_number, 11);
    }

    #[test]
    fn identity_is_cached_until_rejected() {
        let transport = FakeTransport::default()
            .ok("user", json!({ "login": "me" }))
            .err(
                REQUESTED,
                FetchError::AuthExpired("Bad credentials (HTTP 401)".to_string()),
            );
        let fetcher = GitHubFetcher::new(transport);

        assert_eq!(fetcher.current_user().unwrap(), "me");
        assert_eq!(fetcher.current_user().unwrap(), "me");
        let user_calls = |f: &GitHubFetcher<FakeTransport>| {
            f.transport.calls().iter().filter(|c| *c == "user").count()
        };
        assert_eq!(user_calls(&fetcher), 1);

        let err = fetcher.list_review_requests().unwrap_err();
        assert!(matches!(err, FetchError::AuthExpired(_)));

        // The rejected credential forces a fresh identity lookup.
        fetcher.current_user().unwrap();
        assert_eq!(user_calls(&fetcher), 2);
    }

    #[test]
    fn missing_login_is_not_authenticated() {
        let transport = FakeTransport::default().err("user", FetchError::NotAuthenticated);
        let fetcher = GitHubFetcher::new(transport);
        assert_eq!(
            fetcher.list_completed_reviews(since()).unwrap_err(),
            FetchError::NotAuthenticated
        );
    }

    #[test]
    fn malformed_body_is_transport_error() {
        let mut transport = FakeTransport::default();
        transport
            .responses
            .insert("user".to_string(), Ok("<html>".to_string()));
        let err = GitHubFetcher::new(transport).current_user().unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
