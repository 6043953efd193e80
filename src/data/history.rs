//! Local review history: day-bucketed review events persisted in a [`KvStore`].
//!
//! Every operation reads the whole persisted map, mutates it and writes it back.
//! Overlapping writers are tolerated because recording is idempotent per
//! (PR id, timestamp); the last full write wins.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data::error::{FetchError, StoreError, SyncError};
use crate::data::store::KvStore;
use crate::model::github::PullRequest;
use crate::model::review::{
    compact, date_key, days_before, DailyReviewStats, DayCount, ReviewEvent, ReviewOutcome, ReviewStats,
};

pub const STATS_KEY: &str = "review_stats";
pub const LAST_SYNC_KEY: &str = "last_full_sync";
pub const REQUEST_COUNT_KEY: &str = "previous_request_count";

/// Default lookback window for sync and resync.
pub const DEFAULT_DAYS_BACK: u32 = 90;

/// Where completed reviews come from during sync.
pub trait ReviewSource {
    fn completed_reviews_since(&self, since: NaiveDate) -> Result<Vec<ReviewEvent>, FetchError>;
}

pub struct ReviewHistory<S> {
    store: S,
}

impl<S: KvStore> ReviewHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::json(key, e)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::json(key, e))?;
        self.store.set(key, &raw)
    }

    pub fn load_stats(&self) -> Result<ReviewStats, StoreError> {
        Ok(self.get_json(STATS_KEY)?.unwrap_or_default())
    }

    fn save_stats(&mut self, stats: &ReviewStats) -> Result<(), StoreError> {
        self.set_json(STATS_KEY, stats)
    }

    /// Record an event under its calendar day. Returns `false` when an event
    /// with the same PR id and timestamp is already stored.
    pub fn record_review(&mut self, event: ReviewEvent) -> Result<bool, StoreError> {
        let day = event
            .day()
            .ok_or_else(|| StoreError::InvalidTimestamp(event.reviewed_at.clone()))?;
        let key = date_key(day);

        let mut stats = self.load_stats()?;
        let bucket = stats
            .entry(key.clone())
            .or_insert_with(|| DailyReviewStats::new(key));

        if bucket.reviews.iter().any(|e| e.is_same_event(&event)) {
            debug!(pr = event.pr_number, at = %event.reviewed_at, "review already recorded");
            return Ok(false);
        }

        bucket.reviews.push(event);
        bucket.recount();
        self.save_stats(&stats)?;
        Ok(true)
    }

    /// Record that the user opened `pr` locally at `at`.
    pub fn record_view(&mut self, pr: &PullRequest, at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.record_review(ReviewEvent {
            pr_id: pr.id,
            pr_title: pr.title.clone(),
            pr_number: pr.number,
            repository: pr.repository.full_name.clone(),
            reviewed_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            state: ReviewOutcome::ViewedLocally,
            url: Some(pr.url.clone()),
        })
    }

    /// Remove every event for the PR from every day. Returns how many were removed.
    pub fn remove_review_by_key(
        &mut self,
        pr_number: u64,
        repository: &str,
    ) -> Result<usize, StoreError> {
        self.remove_where(|e| e.is_for_pr(pr_number, repository))
    }

    /// Purge all locally generated "viewed" events.
    pub fn cleanup_synthetic_views(&mut self) -> Result<usize, StoreError> {
        let removed = self.remove_where(|e| e.state.is_synthetic())?;
        info!(removed, "purged synthetic view events");
        Ok(removed)
    }

    fn remove_where(&mut self, doomed: impl Fn(&ReviewEvent) -> bool) -> Result<usize, StoreError> {
        let mut stats = self.load_stats()?;
        let mut removed = 0;
        for day in stats.values_mut() {
            let before = day.reviews.len();
            day.reviews.retain(|e| !doomed(e));
            removed += before - day.reviews.len();
        }
        compact(&mut stats);
        self.save_stats(&stats)?;
        Ok(removed)
    }

    /// One entry per day in `start..=end`, zero for days without events.
    /// Empty when `start > end`.
    pub fn get_stats_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayCount>, StoreError> {
        let stats = self.load_stats()?;
        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| DayCount {
                date,
                count: stats.get(&date_key(date)).map_or(0, |d| d.count),
            })
            .collect())
    }

    pub fn get_total_review_count(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, StoreError> {
        Ok(self
            .get_stats_for_range(start, end)?
            .iter()
            .map(|d| d.count)
            .sum())
    }

    /// Events across all days, newest first.
    pub fn recent_reviews(&self, limit: usize) -> Result<Vec<ReviewEvent>, StoreError> {
        let stats = self.load_stats()?;
        let mut events: Vec<ReviewEvent> = stats
            .into_values()
            .flat_map(|d| d.reviews.into_iter())
            .collect();
        events.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        events.truncate(limit);
        Ok(events)
    }

    /// Pull completed reviews from the last `days_back` days and record them.
    /// Returns the number fetched, not the number newly inserted.
    pub fn sync_review_history(
        &mut self,
        source: &impl ReviewSource,
        days_back: u32,
    ) -> Result<usize, SyncError> {
        let today = Local::now().date_naive();
        let since = days_before(today, days_back).ok_or(SyncError::InvalidRange { days_back })?;
        let events = source.completed_reviews_since(since)?;
        let fetched = events.len();

        let mut inserted = 0;
        for event in events {
            match self.record_review(event) {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(StoreError::InvalidTimestamp(at)) => {
                    warn!(%at, "skipping review with unparseable timestamp");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.set_json(LAST_SYNC_KEY, &date_key(today))?;
        info!(fetched, inserted, %since, "synced review history");
        Ok(fetched)
    }

    /// Erase the whole history, then sync.
    pub fn clear_and_resync(
        &mut self,
        source: &impl ReviewSource,
        days_back: u32,
    ) -> Result<usize, SyncError> {
        // Refuse before erasing anything.
        if days_before(Local::now().date_naive(), days_back).is_none() {
            return Err(SyncError::InvalidRange { days_back });
        }
        self.store.remove(STATS_KEY)?;
        info!(days_back, "cleared review history");
        self.sync_review_history(source, days_back)
    }

    pub fn last_sync_date(&self) -> Result<Option<String>, StoreError> {
        self.get_json(LAST_SYNC_KEY)
    }

    /// True unless a full sync already ran on `today`.
    pub fn needs_auto_sync(&self, today: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.last_sync_date()?.as_deref() != Some(date_key(today).as_str()))
    }

    /// Store this poll's review-request count and return how many more there
    /// are than last time.
    pub fn swap_request_count(&mut self, count: usize) -> Result<usize, StoreError> {
        let previous: Option<usize> = self.get_json(REQUEST_COUNT_KEY)?;
        self.set_json(REQUEST_COUNT_KEY, &count)?;
        Ok(previous.map_or(0, |prev| count.saturating_sub(prev)))
    }
}
