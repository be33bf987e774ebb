use std::collections::BTreeSet;

use super::classifier::Grouping;
use super::template::{escape_cell, substitute};
use crate::config::{Layout, ResolvedConfig};
use crate::github::PullRequest;

const TABLE_HEADER: &str = "| PR | Title | Author |\n| --- | --- | --- |";

pub struct Renderer<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    /// Renders the grouped pull requests into the document template.
    pub fn render(&self, grouping: &Grouping, from_tag: &str, to_ref: &str) -> String {
        let changes = if grouping.is_empty() {
            self.config.empty_template.clone()
        } else if self.config.group_by_author {
            self.render_by_author(grouping, from_tag, to_ref)
        } else {
            self.render_sections(grouping, None, "###", from_tag, to_ref)
                .join("\n\n")
        };

        substitute(
            &self.config.template,
            &[
                ("CHANGES", changes.as_str()),
                ("FROM_TAG", from_tag),
                ("TO_REF", to_ref),
            ],
        )
    }

    fn render_by_author(&self, grouping: &Grouping, from_tag: &str, to_ref: &str) -> String {
        let authors: BTreeSet<&str> = grouping.pull_requests().map(|pr| pr.author_login()).collect();

        authors
            .into_iter()
            .map(|login| {
                let sections =
                    self.render_sections(grouping, Some(login), "####", from_tag, to_ref);
                format!("### @{}\n\n{}", login, sections.join("\n\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// One section per non-empty category, in configured order with the fallback last.
    fn render_sections(
        &self,
        grouping: &Grouping,
        author: Option<&str>,
        heading: &str,
        from_tag: &str,
        to_ref: &str,
    ) -> Vec<String> {
        let titles = self
            .config
            .categories
            .iter()
            .map(|c| c.title.as_str())
            .chain(std::iter::once(self.config.other_title.as_str()));

        let mut sections = Vec::new();
        for title in titles {
            let mut prs: Vec<&PullRequest> = grouping
                .get(title)
                .iter()
                .filter(|pr| author.map_or(true, |login| pr.author_login() == login))
                .collect();
            if prs.is_empty() {
                continue;
            }
            sort_by_merge_time(&mut prs);

            let entries = prs
                .iter()
                .map(|pr| self.render_entry(pr, title, from_tag, to_ref))
                .collect::<Vec<_>>()
                .join("\n");

            sections.push(match self.config.layout {
                Layout::List => format!("{heading} {title}\n{entries}"),
                Layout::Table => format!("{heading} {title}\n{TABLE_HEADER}\n{entries}"),
            });
        }
        sections
    }

    fn render_entry(&self, pr: &PullRequest, category: &str, from_tag: &str, to_ref: &str) -> String {
        let number = pr.number.to_string();

        match self.config.layout {
            Layout::List => substitute(
                &self.config.pr_template,
                &[
                    ("TITLE", pr.title.as_str()),
                    ("NUMBER", number.as_str()),
                    ("URL", pr.url.as_str()),
                    ("AUTHOR", pr.author_login()),
                    ("CATEGORY", category),
                    ("FROM_TAG", from_tag),
                    ("TO_REF", to_ref),
                ],
            ),
            Layout::Table => {
                let title = escape_cell(&pr.title);
                let author = escape_cell(pr.author_login());
                let category = escape_cell(category);
                substitute(
                    &self.config.table_row_template,
                    &[
                        ("TITLE", title.as_str()),
                        ("NUMBER", number.as_str()),
                        ("URL", pr.url.as_str()),
                        ("AUTHOR", author.as_str()),
                        ("CATEGORY", category.as_str()),
                        ("FROM_TAG", from_tag),
                        ("TO_REF", to_ref),
                    ],
                )
            }
        }
    }
}

/// Most recently merged first; ties fall back to ascending PR number.
fn sort_by_merge_time(prs: &mut [&PullRequest]) {
    prs.sort_by(|a, b| {
        b.merged_timestamp()
            .cmp(&a.merged_timestamp())
            .then_with(|| a.number.cmp(&b.number))
    });
}
