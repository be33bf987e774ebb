use std::collections::BTreeMap;
use tracing::{debug, info};

use super::batch::{batched, DEFAULT_BATCH_SIZE};
use crate::error::Result;
use crate::github::{Platform, PullRequest};

/// Resolves the merged pull requests between a tag and a head commit.
pub struct RangeCollector<'a> {
    platform: &'a dyn Platform,
    batch_size: usize,
    base_branch: Option<&'a str>,
}

impl<'a> RangeCollector<'a> {
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self {
            platform,
            batch_size: DEFAULT_BATCH_SIZE,
            base_branch: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn base_branch(mut self, base_branch: Option<&'a str>) -> Self {
        self.base_branch = base_branch;
        self
    }

    /// Pull requests merged in `(prev_tag, head]`, one per number, ordered by number.
    pub async fn collect(&self, prev_tag: &str, head: &str) -> Result<Vec<PullRequest>> {
        let commits = self.platform.commits_between(prev_tag, head).await?;
        if commits.is_empty() {
            info!("No commits found between {} and {}", prev_tag, head);
            return Ok(Vec::new());
        }
        debug!(count = commits.len(), "commits in range");

        let platform = self.platform;
        let shas = commits.into_iter().map(|c| c.sha).collect();
        let associated = batched(shas, self.batch_size, |sha: String| async move {
            platform.pull_requests_for_commit(&sha).await
        })
        .await?;

        let mut merged: BTreeMap<u64, PullRequest> = BTreeMap::new();
        for pr in associated.into_iter().flatten() {
            if self.retains(&pr) {
                merged.insert(pr.number, pr);
            }
        }

        if merged.is_empty() {
            info!("No merged PRs found in range {}...{}", prev_tag, head);
            return Ok(Vec::new());
        }

        let numbers = merged.into_keys().collect();
        let detailed = batched(numbers, self.batch_size, |number: u64| async move {
            platform.pull_request_detail(number).await
        })
        .await?;

        info!("Collected {} merged pull requests", detailed.len());
        Ok(detailed)
    }

    fn retains(&self, pr: &PullRequest) -> bool {
        if !pr.is_merged() {
            return false;
        }
        match self.base_branch {
            Some(base) => pr.base_ref == base,
            None => true,
        }
    }
}
