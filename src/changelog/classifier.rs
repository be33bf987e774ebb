use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::config::{CategoryConfig, ResolvedConfig};
use crate::github::PullRequest;

/// Pull requests bucketed by category title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    sections: BTreeMap<String, Vec<PullRequest>>,
}

impl Grouping {
    pub fn insert(&mut self, category: &str, pr: PullRequest) {
        self.sections.entry(category.to_string()).or_default().push(pr);
    }

    pub fn get(&self, category: &str) -> &[PullRequest] {
        self.sections.get(category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn pull_requests(&self) -> impl Iterator<Item = &PullRequest> {
        self.sections.values().flatten()
    }
}

pub struct Classifier<'a> {
    categories: &'a [CategoryConfig],
    other_title: &'a str,
    ignore: HashSet<String>,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self {
            categories: &config.categories,
            other_title: &config.other_title,
            ignore: config.ignore_labels.iter().map(|l| l.to_lowercase()).collect(),
        }
    }

    /// Lowercase label names, or tokens derived from the title prefix and head
    /// branch when the pull request carries no labels.
    pub fn tokens(pr: &PullRequest) -> HashSet<String> {
        if !pr.labels.is_empty() {
            return pr.labels.iter().map(|l| l.to_lowercase()).collect();
        }

        let mut tokens = HashSet::new();
        if let Some(kind) = conventional_type(&pr.title) {
            tokens.insert(kind);
        }
        if let Some((prefix, _)) = pr.head_ref.as_deref().and_then(|r| r.split_once('/')) {
            if !prefix.is_empty() {
                tokens.insert(prefix.to_lowercase());
            }
        }
        tokens
    }

    /// Category title for `pr`, or `None` when an ignore label applies.
    pub fn categorize(&self, pr: &PullRequest) -> Option<&'a str> {
        let tokens = Self::tokens(pr);
        if tokens.iter().any(|t| self.ignore.contains(t)) {
            return None;
        }

        let title = self
            .categories
            .iter()
            .find(|category| {
                category
                    .labels
                    .iter()
                    .any(|label| tokens.contains(&label.to_lowercase()))
            })
            .map(|category| category.title.as_str())
            .unwrap_or(self.other_title);
        Some(title)
    }

    pub fn group(&self, prs: Vec<PullRequest>) -> Grouping {
        let mut grouping = Grouping::default();
        for pr in prs {
            match self.categorize(&pr) {
                Some(category) => grouping.insert(category, pr),
                None => debug!(number = pr.number, "ignoring pull request"),
            }
        }
        grouping
    }
}

/// `feat(scope)!: add x` -> `feat`.
fn conventional_type(title: &str) -> Option<String> {
    let (head, _) = title.split_once(':')?;
    let kind = head.split('(').next().unwrap_or(head).trim_end_matches('!').trim();
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    Some(kind.to_lowercase())
}
