//! Resolution of the repository, head ref and pull request a run targets.

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ChangelogError, Result};

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    pull_request: Option<EventPullRequest>,
}

#[derive(Debug, Deserialize)]
struct EventPullRequest {
    number: u64,
    head: EventHead,
}

#[derive(Debug, Deserialize)]
struct EventHead {
    #[serde(rename = "ref")]
    ref_name: Option<String>,
    sha: Option<String>,
}

/// Raw inputs, from flags or the workflow environment.
#[derive(Debug, Clone, Default)]
pub struct ContextInputs {
    pub repository: String,
    pub head_ref: Option<String>,
    pub head_sha: Option<String>,
    pub pr_number: Option<u64>,
    pub event_path: Option<PathBuf>,
    pub git_ref: Option<String>,
    pub sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub owner: String,
    pub repo: String,
    pub head_ref: String,
    pub head_sha: Option<String>,
    pub pr_number: Option<u64>,
}

impl RunContext {
    pub fn resolve(inputs: &ContextInputs) -> Result<Self> {
        let (owner, repo) = inputs
            .repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| {
                ChangelogError::Context(format!(
                    "repository must look like owner/repo, got \"{}\"",
                    inputs.repository
                ))
            })?;

        let event = match &inputs.event_path {
            Some(path) => read_event(path)?,
            None => EventPayload::default(),
        };
        let pull_request = event.pull_request.as_ref();

        let head_ref = non_empty(inputs.head_ref.clone())
            .or_else(|| pull_request.and_then(|pr| non_empty(pr.head.ref_name.clone())))
            .or_else(|| {
                inputs
                    .git_ref
                    .as_deref()
                    .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r).to_string())
            })
            .unwrap_or_default();

        let head_sha = non_empty(inputs.head_sha.clone())
            .or_else(|| pull_request.and_then(|pr| non_empty(pr.head.sha.clone())))
            .or_else(|| non_empty(inputs.sha.clone()));

        let context = RunContext {
            owner: owner.to_string(),
            repo: repo.to_string(),
            head_ref,
            head_sha,
            pr_number: inputs.pr_number.or(pull_request.map(|pr| pr.number)),
        };
        debug!(?context, "resolved run context");
        Ok(context)
    }

    pub fn head_sha(&self) -> Result<&str> {
        self.head_sha
            .as_deref()
            .ok_or_else(|| ChangelogError::Context("no head commit SHA available".to_string()))
    }

    /// The head ref, or the abbreviated head SHA when no ref is known.
    pub fn to_ref(&self) -> String {
        if !self.head_ref.is_empty() {
            return self.head_ref.clone();
        }
        self.head_sha
            .as_deref()
            .map(|sha| sha.chars().take(7).collect())
            .unwrap_or_default()
    }
}

/// Compiles the branch filter. Called before any network access.
pub fn compile_branch_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ChangelogError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn read_event(path: &Path) -> Result<EventPayload> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
