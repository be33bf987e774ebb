use serde::Deserialize;
use std::collections::HashSet;

use crate::error::{ChangelogError, Result};

pub const DEFAULT_TEMPLATE: &str =
    "## 🔖 Release Preview\nChanges since $FROM_TAG → $TO_REF\n\n$CHANGES";
pub const DEFAULT_EMPTY_TEMPLATE: &str = "_No merged pull requests found in this range._";
pub const DEFAULT_PR_TEMPLATE: &str = "- $TITLE (#$NUMBER) by @$AUTHOR";
pub const DEFAULT_TABLE_ROW_TEMPLATE: &str = "| [#$NUMBER]($URL) | $TITLE | @$AUTHOR |";
pub const DEFAULT_OTHER_TITLE: &str = "Other changes";
pub const DEFAULT_IGNORE_LABELS: &[&str] = &["skip-changelog", "no-changelog"];

/// Built-in category table, in match priority order.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("🚀 Features", &["feature", "feat", "enhancement"]),
    ("🐛 Bug Fixes", &["fix", "bug", "hotfix"]),
    ("📚 Docs", &["doc", "docs", "documentation"]),
    ("🧪 Tests", &["test", "tests", "qa"]),
    ("🧹 Chores", &["chore", "maintenance", "refactor"]),
    ("📦 Dependencies", &["deps", "dependencies"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    List,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// User overrides as read from the configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    pub template: Option<String>,
    pub empty_template: Option<String>,
    pub pr_template: Option<String>,
    pub table_row_template: Option<String>,
    pub categories: Option<Vec<CategoryConfig>>,
    pub ignore_labels: Option<Vec<String>>,
    pub other_title: Option<String>,
    pub layout: Option<Layout>,
    pub group_by_author: Option<bool>,
    pub base_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub template: String,
    pub empty_template: String,
    pub pr_template: String,
    pub table_row_template: String,
    pub categories: Vec<CategoryConfig>,
    pub ignore_labels: Vec<String>,
    pub other_title: String,
    pub layout: Layout,
    pub group_by_author: bool,
    pub base_branch: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            template: DEFAULT_TEMPLATE.to_string(),
            empty_template: DEFAULT_EMPTY_TEMPLATE.to_string(),
            pr_template: DEFAULT_PR_TEMPLATE.to_string(),
            table_row_template: DEFAULT_TABLE_ROW_TEMPLATE.to_string(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(title, labels)| CategoryConfig {
                    title: title.to_string(),
                    labels: labels.iter().map(|l| l.to_string()).collect(),
                })
                .collect(),
            ignore_labels: DEFAULT_IGNORE_LABELS.iter().map(|l| l.to_string()).collect(),
            other_title: DEFAULT_OTHER_TITLE.to_string(),
            layout: Layout::List,
            group_by_author: false,
            base_branch: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ResolvedConfig {
    /// Merges user overrides over the built-in defaults and validates the result.
    ///
    /// Empty strings and an empty category list fall back to the defaults. A
    /// present `ignore_labels` list replaces the default one even when empty.
    pub fn merge(raw: RawConfig, source: &str) -> Result<Self> {
        let defaults = ResolvedConfig::default();

        let resolved = ResolvedConfig {
            template: non_empty(raw.template).unwrap_or(defaults.template),
            empty_template: non_empty(raw.empty_template).unwrap_or(defaults.empty_template),
            pr_template: non_empty(raw.pr_template).unwrap_or(defaults.pr_template),
            table_row_template: non_empty(raw.table_row_template)
                .unwrap_or(defaults.table_row_template),
            categories: raw
                .categories
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.categories),
            ignore_labels: raw.ignore_labels.unwrap_or(defaults.ignore_labels),
            other_title: non_empty(raw.other_title).unwrap_or(defaults.other_title),
            layout: raw.layout.unwrap_or(defaults.layout),
            group_by_author: raw.group_by_author.unwrap_or(defaults.group_by_author),
            base_branch: non_empty(raw.base_branch),
        };

        resolved.validate(source)?;
        Ok(resolved)
    }

    fn validate(&self, source: &str) -> Result<()> {
        for (name, value) in [
            ("template", &self.template),
            ("pr_template", &self.pr_template),
            ("table_row_template", &self.table_row_template),
            ("other_title", &self.other_title),
        ] {
            if value.trim().is_empty() {
                return Err(ChangelogError::config(source, format!("{name} must not be blank")));
            }
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            let title = category.title.trim();
            if title.is_empty() {
                return Err(ChangelogError::config(source, "category title must not be empty"));
            }
            if title == self.other_title.trim() {
                return Err(ChangelogError::config(
                    source,
                    format!("category \"{title}\" collides with the fallback category"),
                ));
            }
            if !seen.insert(title) {
                return Err(ChangelogError::config(
                    source,
                    format!("duplicate category \"{title}\""),
                ));
            }
        }

        Ok(())
    }
}
