use async_trait::async_trait;

use super::types::{Comment, CommitRef, CompareStatus, PullRequest, Tag};
use crate::error::Result;

/// Repository hosting operations the changelog run depends on.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Tags in listing order, most recent first.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn compare_status(&self, base: &str, head: &str) -> Result<CompareStatus>;

    /// Every commit reachable from `head` but not from `base`.
    async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<CommitRef>>;

    async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<PullRequest>>;

    async fn pull_request_detail(&self, number: u64) -> Result<PullRequest>;

    async fn list_comments(&self, issue: u64) -> Result<Vec<Comment>>;

    async fn create_comment(&self, issue: u64, body: &str) -> Result<Comment>;

    async fn update_comment(&self, id: u64, body: &str) -> Result<()>;
}
