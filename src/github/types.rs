use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Login rendered for pull requests whose author is not known.
pub const UNKNOWN_AUTHOR: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sha: String,
}

/// Position of `head` relative to `base` in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareStatus {
    Ahead,
    Behind,
    Identical,
    Diverged,
}

impl CompareStatus {
    /// True when `base` is an ancestor of, or equal to, `head`.
    pub fn contains_base(self) -> bool {
        matches!(self, CompareStatus::Ahead | CompareStatus::Identical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub login: String,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub merged_at: Option<String>,
    pub base_ref: String,
    pub head_ref: Option<String>,
    pub author: Option<Author>,
    pub url: String,
    pub labels: Vec<String>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Merge time used for ordering. Missing or unparseable values sort as the oldest.
    pub fn merged_timestamp(&self) -> DateTime<Utc> {
        self.merged_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn author_login(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.login.as_str())
            .filter(|login| !login.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub body: String,
}
