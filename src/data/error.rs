//! Error types for the GitHub fetcher and the local review history.

use thiserror::Error;

/// Failures from the GitHub side. Callers only need to branch on these three.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No credential is available and none could be obtained.
    #[error("not authenticated with GitHub (run `gh auth login`)")]
    NotAuthenticated,

    /// GitHub rejected the credential.
    #[error("GitHub authentication expired: {0}")]
    AuthExpired(String),

    /// Anything else, with the remote's message passed through.
    #[error("GitHub request failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// Classify a failed `gh` invocation from its stderr.
    pub fn from_gh_stderr(stderr: &str) -> Self {
        let lower = stderr.to_ascii_lowercase();
        if lower.contains("gh auth login")
            || lower.contains("not logged in")
            || lower.contains("no oauth token")
            || lower.contains("authentication token not found")
        {
            Self::NotAuthenticated
        } else if lower.contains("http 401")
            || lower.contains("bad credentials")
            || lower.contains("requires authentication")
        {
            Self::AuthExpired(stderr.trim().to_string())
        } else {
            Self::Transport(stderr.trim().to_string())
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AuthExpired(_))
    }

    /// Short code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::AuthExpired(_) => "auth_expired",
            Self::Transport(_) => "transport",
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(format!("unexpected response from GitHub: {}", e))
    }
}

/// Failures of the persisted key-value state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt stored value for {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("review timestamp {0:?} has no calendar date")]
    InvalidTimestamp(String),
}

impl StoreError {
    pub fn json(key: &str, source: serde_json::Error) -> Self {
        Self::Json {
            key: key.to_string(),
            source,
        }
    }
}

/// Failures of sync and resync. Fetch failures pass through unmodified.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot look back {days_back} days from today")]
    InvalidRange { days_back: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_missing_login() {
        let err = FetchError::from_gh_stderr(
            "To get started with GitHub CLI, please run:  gh auth login",
        );
        assert_eq!(err, FetchError::NotAuthenticated);
        assert!(err.is_auth());
    }

    #[test]
    fn classifies_rejected_credential() {
        let err = FetchError::from_gh_stderr("gh: Bad credentials (HTTP 401)\n");
        assert_eq!(
            err,
            FetchError::AuthExpired("gh: Bad credentials (HTTP 401)".to_string())
        );
        assert_eq!(err.code(), "auth_expired");
    }

    #[test]
    fn everything_else_is_transport() {
        let err = FetchError::from_gh_stderr("gh: Not Found (HTTP 404)");
        assert_eq!(err, FetchError::Transport("gh: Not Found (HTTP 404)".to_string()));
        assert!(!err.is_auth());
    }
}
