use serde::Deserialize;

// ---------------------------------------------------------------------------
// Raw REST payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GhUser {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// `GET search/issues` response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    /// `https://api.github.com/repos/{owner}/{name}`
    pub repository_url: String,
    pub user: GhUser,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub labels: Vec<GhLabel>,
    pub created_at: String,
    pub updated_at: String,
}

impl SearchItem {
    /// `owner/name` parsed from `repository_url`.
    pub fn repo_full_name(&self) -> Option<String> {
        let rest = self.repository_url.split("/repos/").nth(1)?;
        let mut parts = rest.trim_end_matches('/').splitn(2, '/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let name = parts.next().filter(|s| !s.is_empty())?;
        Some(format!("{}/{}", owner, name))
    }
}

/// `GET repos/{owner}/{repo}/pulls/{number}` (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct PullDetail {
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub review_comments: u64,
    #[serde(default)]
    pub requested_reviewers: Vec<GhUser>,
}

/// One element of `GET repos/{owner}/{repo}/pulls/{number}/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct GhReview {
    pub id: u64,
    pub user: Option<GhUser>,
    pub state: String,
    /// Absent while the review is still pending.
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Assembled review request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub full_name: String,
    pub name: String,
    pub owner: String,
}

impl Repository {
    pub fn from_full_name(full_name: &str) -> Self {
        let (owner, name) = full_name.split_once('/').unwrap_or(("", full_name));
        Self {
            full_name: full_name.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrAuthor {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrLabel {
    pub name: String,
    pub color: String,
}

/// An open PR awaiting the user's review. Rebuilt on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub repository: Repository,
    pub author: PrAuthor,
    pub created_at: String,
    pub updated_at: String,
    pub is_draft: bool,
    pub state: String,
    pub requested_reviewers: Vec<String>,
    pub comments: u64,
    pub review_comments: u64,
    pub additions: u64,
    pub deletions: u64,
    pub labels: Vec<PrLabel>,
}

impl PullRequest {
    /// Build from a search hit, optionally enriched with the PR detail.
    /// Without detail the diff stats are zero and the PR counts as non-draft.
    pub fn assemble(item: &SearchItem, repo: Repository, detail: Option<&PullDetail>) -> Self {
        Self {
            id: item.id,
            number: item.number,
            title: item.title.clone(),
            url: item.html_url.clone(),
            repository: repo,
            author: PrAuthor {
                login: item.user.login.clone(),
                avatar_url: item.user.avatar_url.clone(),
            },
            created_at: item.created_at.clone(),
            updated_at: item.updated_at.clone(),
            is_draft: detail.map(|d| d.draft).unwrap_or(false),
            state: item.state.clone(),
            requested_reviewers: detail
                .map(|d| d.requested_reviewers.iter().map(|u| u.login.clone()).collect())
                .unwrap_or_default(),
            comments: detail.map(|d| d.comments).unwrap_or(item.comments),
            review_comments: detail.map(|d| d.review_comments).unwrap_or(0),
            additions: detail.map(|d| d.additions).unwrap_or(0),
            deletions: detail.map(|d| d.deletions).unwrap_or(0),
            labels: item
                .labels
                .iter()
                .map(|l| PrLabel {
                    name: l.name.clone(),
                    color: l.color.clone(),
                })
                .collect(),
        }
    }

    /// Size label based on total changes (additions + deletions).
    pub fn size_label(&self) -> &'static str {
        let total = self.additions + self.deletions;
        match total {
            0..=9 => "XS",
            10..=49 => "S",
            50..=249 => "M",
            250..=999 => "L",
            _ => "XL",
        }
    }

    /// `owner/name#123`
    pub fn reference(&self) -> String {
        format!("{}#{}", self.repository.full_name, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> SearchItem {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "number": 17,
            "title": "Add retries",
            "html_url": "https://github.com/acme/widgets/pull/17",
            "repository_url": "https://api.github.com/repos/acme/widgets",
            "user": { "login": "octo", "avatar_url": "https://avatars/octo" },
            "state": "open",
            "comments": 3,
            "labels": [{ "name": "bug", "color": "d73a4a" }],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn repo_name_from_repository_url() {
        assert_eq!(item().repo_full_name().as_deref(), Some("acme/widgets"));
        let mut broken = item();
        broken.repository_url = "https://api.github.com/repos/acme".to_string();
        assert_eq!(broken.repo_full_name(), None);
    }

    #[test]
    fn assemble_without_detail_degrades() {
        let item = item();
        let pr = PullRequest::assemble(&item, Repository::from_full_name("acme/widgets"), None);
        assert!(!pr.is_draft);
        assert_eq!(pr.additions, 0);
        assert_eq!(pr.comments, 3);
        assert_eq!(pr.repository.owner, "acme");
        assert_eq!(pr.repository.name, "widgets");
        assert_eq!(pr.labels[0].color, "d73a4a");
        assert_eq!(pr.reference(), "acme/widgets#17");
    }

    #[test]
    fn assemble_with_detail() {
        let item = item();
        let detail = PullDetail {
            draft: true,
            additions: 120,
            deletions: 30,
            comments: 4,
            review_comments: 9,
            requested_reviewers: vec![GhUser {
                login: "me".to_string(),
                avatar_url: String::new(),
            }],
        };
        let pr = PullRequest::assemble(
            &item,
            Repository::from_full_name("acme/widgets"),
            Some(&detail),
        );
        assert!(pr.is_draft);
        assert_eq!(pr.size_label(), "M");
        assert_eq!(pr.review_comments, 9);
        assert_eq!(pr.requested_reviewers, vec!["me".to_string()]);
    }
}
