use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Format of the day-bucket keys and of the persisted last-sync date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `day` minus `days` calendar days, or `None` when that falls outside the
/// representable date range.
pub fn days_before(day: NaiveDate, days: u32) -> Option<NaiveDate> {
    day.checked_sub_days(Days::new(u64::from(days)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "CHANGES_REQUESTED")]
    ChangesRequested,
    #[serde(rename = "COMMENTED")]
    Commented,
    /// Recorded locally when a PR is opened; never submitted to GitHub.
    #[serde(rename = "VIEWED")]
    ViewedLocally,
}

impl ReviewOutcome {
    /// Map a GitHub review `state`. Pending, dismissed and unknown states yield `None`.
    pub fn from_api_state(state: &str) -> Option<Self> {
        match state {
            "APPROVED" => Some(Self::Approved),
            "CHANGES_REQUESTED" => Some(Self::ChangesRequested),
            "COMMENTED" => Some(Self::Commented),
            _ => None,
        }
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::ViewedLocally)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes requested",
            Self::Commented => "commented",
            Self::ViewedLocally => "viewed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Approved => "[+]",
            Self::ChangesRequested => "[!]",
            Self::Commented => "[c]",
            Self::ViewedLocally => "[v]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub pr_id: u64,
    pub pr_title: String,
    pub pr_number: u64,
    pub repository: String,
    /// ISO-8601 timestamp as reported by GitHub (or generated locally for views).
    pub reviewed_at: String,
    pub state: ReviewOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ReviewEvent {
    /// Calendar day of the event, taken from the date part of `reviewed_at`.
    pub fn day(&self) -> Option<NaiveDate> {
        self.reviewed_at
            .get(..10)
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
    }

    /// Two events are the same event when PR id and timestamp both match.
    pub fn is_same_event(&self, other: &ReviewEvent) -> bool {
        self.pr_id == other.pr_id && self.reviewed_at == other.reviewed_at
    }

    pub fn is_for_pr(&self, pr_number: u64, repository: &str) -> bool {
        self.pr_number == pr_number && self.repository == repository
    }
}

/// All events recorded on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReviewStats {
    pub date: String,
    pub count: usize,
    /// Insertion order, not sorted by time.
    pub reviews: Vec<ReviewEvent>,
}

impl DailyReviewStats {
    pub fn new(date: String) -> Self {
        Self {
            date,
            count: 0,
            reviews: Vec::new(),
        }
    }

    pub fn recount(&mut self) {
        self.count = self.reviews.len();
    }
}

/// Sparse map from `YYYY-MM-DD` to that day's bucket.
pub type ReviewStats = BTreeMap<String, DailyReviewStats>;

/// Re-establish `count == reviews.len()` for every bucket and drop empty buckets.
pub fn compact(stats: &mut ReviewStats) {
    stats.retain(|_, day| {
        day.recount();
        day.count > 0
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Heatmap shade for a day's count, 0 (none) through 4 (busiest).
pub fn intensity(count: usize) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=9 => 3,
        _ => 4,
    }
}

/// Arrange consecutive days into Monday-first week columns.
/// Slots before the first day and after the last are `None`.
pub fn heatmap_weeks(days: &[DayCount]) -> Vec<[Option<DayCount>; 7]> {
    let mut weeks: Vec<[Option<DayCount>; 7]> = Vec::new();
    let mut current: [Option<DayCount>; 7] = [None; 7];
    let mut started = false;

    for day in days {
        let slot = day.date.weekday().num_days_from_monday() as usize;
        if started && slot == 0 {
            weeks.push(current);
            current = [None; 7];
        }
        current[slot] = Some(*day);
        started = true;
    }
    if started {
        weeks.push(current);
    }
    weeks
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    pub total: usize,
    pub active_days: usize,
    pub current_streak: usize,
    pub longest_streak: usize,
    pub busiest: Option<DayCount>,
}

impl ActivitySummary {
    /// Summarize a chronological run of days.
    pub fn from_days(days: &[DayCount]) -> Self {
        let mut summary = Self::default();
        let mut run = 0;

        for day in days {
            summary.total += day.count;
            if day.count > 0 {
                summary.active_days += 1;
                run += 1;
                summary.longest_streak = summary.longest_streak.max(run);
                if summary.busiest.map_or(true, |b| day.count > b.count) {
                    summary.busiest = Some(*day);
                }
            } else {
                run = 0;
            }
        }

        // An empty last day (usually today) doesn't break the current streak yet.
        let tail = match days.split_last() {
            Some((last, rest)) if last.count == 0 => rest,
            _ => days,
        };
        summary.current_streak = tail.iter().rev().take_while(|d| d.count > 0).count();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pr_id: u64, at: &str, state: ReviewOutcome) -> ReviewEvent {
        ReviewEvent {
            pr_id,
            pr_title: format!("PR {}", pr_id),
            pr_number: pr_id,
            repository: "acme/widgets".to_string(),
            reviewed_at: at.to_string(),
            state,
            url: None,
        }
    }

    fn day(date: &str, count: usize) -> DayCount {
        DayCount {
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            count,
        }
    }

    #[test]
    fn outcome_uses_github_state_names_on_disk() {
        let json = serde_json::to_string(&ReviewOutcome::ChangesRequested).unwrap();
        assert_eq!(json, "\"CHANGES_REQUESTED\"");
        let viewed: ReviewOutcome = serde_json::from_str("\"VIEWED\"").unwrap();
        assert_eq!(viewed, ReviewOutcome::ViewedLocally);
        assert!(viewed.is_synthetic());
    }

    #[test]
    fn pending_and_dismissed_reviews_have_no_outcome() {
        assert_eq!(ReviewOutcome::from_api_state("PENDING"), None);
        assert_eq!(ReviewOutcome::from_api_state("DISMISSED"), None);
        assert_eq!(
            ReviewOutcome::from_api_state("APPROVED"),
            Some(ReviewOutcome::Approved)
        );
    }

    #[test]
    fn event_fields_are_camel_case() {
        let e = event(7, "2024-03-05T09:00:00Z", ReviewOutcome::Approved);
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(value["prId"], 7);
        assert_eq!(value["reviewedAt"], "2024-03-05T09:00:00Z");
        assert!(value.get("url").is_none());
    }

    #[test]
    fn day_truncates_timestamp() {
        let e = event(1, "2024-01-31T23:59:59-05:00", ReviewOutcome::Commented);
        assert_eq!(e.day(), NaiveDate::from_ymd_opt(2024, 1, 31));
        let bad = event(1, "yesterday", ReviewOutcome::Commented);
        assert_eq!(bad.day(), None);
    }

    #[test]
    fn days_before_stays_in_range() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_before(today, 1), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(days_before(today, 0), Some(today));
        assert_eq!(days_before(today, u32::MAX), None);
    }

    #[test]
    fn compact_drops_empty_days_and_fixes_counts() {
        let mut stats = ReviewStats::new();
        let mut full = DailyReviewStats::new("2024-01-01".to_string());
        full.reviews
            .push(event(1, "2024-01-01T10:00:00Z", ReviewOutcome::Approved));
        full.count = 5;
        stats.insert(full.date.clone(), full);
        stats.insert(
            "2024-01-02".to_string(),
            DailyReviewStats::new("2024-01-02".to_string()),
        );

        compact(&mut stats);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats["2024-01-01"].count, 1);
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2024-01-03 is a Wednesday.
        let days = vec![
            day("2024-01-03", 1),
            day("2024-01-04", 0),
            day("2024-01-05", 0),
            day("2024-01-06", 0),
            day("2024-01-07", 0),
            day("2024-01-08", 2),
        ];
        let weeks = heatmap_weeks(&days);
        assert_eq!(weeks.len(), 2);
        assert!(weeks[0][0].is_none());
        assert!(weeks[0][1].is_none());
        assert_eq!(weeks[0][2].map(|d| d.count), Some(1));
        assert_eq!(weeks[1][0].map(|d| d.count), Some(2));
        assert!(weeks[1][1].is_none());
    }

    #[test]
    fn summary_tracks_streaks() {
        let days = vec![
            day("2024-01-01", 1),
            day("2024-01-02", 3),
            day("2024-01-03", 0),
            day("2024-01-04", 2),
            day("2024-01-05", 1),
            day("2024-01-06", 0),
        ];
        let s = ActivitySummary::from_days(&days);
        assert_eq!(s.total, 7);
        assert_eq!(s.active_days, 4);
        assert_eq!(s.longest_streak, 2);
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.busiest.map(|d| d.count), Some(3));
    }

    #[test]
    fn intensity_buckets() {
        assert_eq!(intensity(0), 0);
        assert_eq!(intensity(2), 1);
        assert_eq!(intensity(5), 2);
        assert_eq!(intensity(9), 3);
        assert_eq!(intensity(40), 4);
    }
}
