//! In-memory `Platform` used by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::platform::Platform;
use super::types::{Author, Comment, CommitRef, CompareStatus, PullRequest, Tag};
use crate::error::{ChangelogError, Result};

#[derive(Default)]
pub struct FakePlatform {
    pub tags: Vec<Tag>,
    pub statuses: HashMap<String, CompareStatus>,
    pub commits: Vec<CommitRef>,
    pub prs_by_commit: HashMap<String, Vec<PullRequest>>,
    pub details: HashMap<u64, PullRequest>,
    pub failing_commits: Vec<String>,
    pub comments: Mutex<Vec<Comment>>,
    pub compared: Mutex<Vec<String>>,
    pub updated: Mutex<Vec<u64>>,
}

pub fn pr(number: u64, title: &str, merged_at: Option<&str>, login: &str, labels: &[&str]) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        merged_at: merged_at.map(str::to_string),
        base_ref: "main".to_string(),
        head_ref: None,
        author: Some(Author {
            login: login.to_string(),
            avatar_url: None,
            profile_url: Some(format!("https://github.com/{login}")),
        }),
        url: format!("https://github.com/acme/demo/pull/{number}"),
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}

impl FakePlatform {
    /// Tags `v2.0.0` (behind) and `v1.0.0` (ahead), commits `c1` -> #123 and `c2` -> #124.
    pub fn scenario() -> Self {
        let mut fake = FakePlatform {
            tags: vec![
                Tag { name: "v2.0.0".to_string() },
                Tag { name: "v1.0.0".to_string() },
            ],
            statuses: HashMap::from([
                ("v2.0.0".to_string(), CompareStatus::Behind),
                ("v1.0.0".to_string(), CompareStatus::Ahead),
            ]),
            ..Default::default()
        };
        fake.add_commit(
            "c1",
            vec![pr(123, "feat: add feature", Some("2024-12-01T00:00:00Z"), "alice", &["feature"])],
        );
        fake.add_commit(
            "c2",
            vec![pr(124, "fix: critical bug", Some("2024-12-02T00:00:00Z"), "bob", &["bug"])],
        );
        fake
    }

    /// Registers a commit in range along with its associated pull requests.
    pub fn add_commit(&mut self, sha: &str, prs: Vec<PullRequest>) {
        self.commits.push(CommitRef { sha: sha.to_string() });
        for pr in &prs {
            self.details.insert(pr.number, pr.clone());
        }
        self.prs_by_commit.insert(sha.to_string(), prs);
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.clone())
    }

    async fn compare_status(&self, base: &str, _head: &str) -> Result<CompareStatus> {
        self.compared.lock().unwrap().push(base.to_string());
        Ok(self.statuses.get(base).copied().unwrap_or(CompareStatus::Ahead))
    }

    async fn commits_between(&self, _base: &str, _head: &str) -> Result<Vec<CommitRef>> {
        Ok(self.commits.clone())
    }

    async fn pull_requests_for_commit(&self, sha: &str) -> Result<Vec<PullRequest>> {
        if self.failing_commits.iter().any(|s| s == sha) {
            return Err(ChangelogError::platform(format!("lookup failed for {sha}")));
        }
        Ok(self.prs_by_commit.get(sha).cloned().unwrap_or_default())
    }

    async fn pull_request_detail(&self, number: u64) -> Result<PullRequest> {
        self.details
            .get(&number)
            .cloned()
            .ok_or_else(|| ChangelogError::platform(format!("missing PR #{number}")))
    }

    async fn list_comments(&self, _issue: u64) -> Result<Vec<Comment>> {
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn create_comment(&self, _issue: u64, body: &str) -> Result<Comment> {
        let mut comments = self.comments.lock().unwrap();
        let comment = Comment {
            id: 900 + comments.len() as u64,
            body: body.to_string(),
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: u64, body: &str) -> Result<()> {
        self.updated.lock().unwrap().push(id);
        let mut comments = self.comments.lock().unwrap();
        match comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.body = body.to_string();
                Ok(())
            }
            None => Err(ChangelogError::platform(format!("missing comment {id}"))),
        }
    }
}
