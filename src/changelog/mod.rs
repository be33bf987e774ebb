pub mod batch;
pub mod classifier;
pub mod comment;
pub mod range_collector;
pub mod renderer;
pub mod tag_locator;
pub mod template;

pub use batch::DEFAULT_BATCH_SIZE;
pub use classifier::Classifier;
pub use comment::upsert_comment;
pub use range_collector::RangeCollector;
pub use renderer::Renderer;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::github::Platform;

/// Values published by a run. Empty results leave every field empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangelogOutput {
    pub body: String,
    pub prev_tag: String,
    pub count: usize,
}

pub struct ChangelogBuilder<'a> {
    platform: &'a dyn Platform,
    config: &'a ResolvedConfig,
    batch_size: usize,
}

impl<'a> ChangelogBuilder<'a> {
    pub fn new(platform: &'a dyn Platform, config: &'a ResolvedConfig) -> Self {
        Self {
            platform,
            config,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Nearest tag that `head` contains, scanning tags in listing order.
    pub async fn previous_tag(&self, head: &str) -> Result<Option<String>> {
        let tags = self.platform.list_tags().await?;
        if tags.is_empty() {
            info!("No tags found; skipping");
            return Ok(None);
        }
        tag_locator::locate_previous_tag(self.platform, &tags, head).await
    }

    pub async fn build(&self, head: &str, to_ref: &str) -> Result<ChangelogOutput> {
        let Some(prev_tag) = self.previous_tag(head).await? else {
            return Ok(ChangelogOutput::default());
        };

        let prs = RangeCollector::new(self.platform)
            .batch_size(self.batch_size)
            .base_branch(self.config.base_branch.as_deref())
            .collect(&prev_tag, head)
            .await?;
        if prs.is_empty() {
            return Ok(ChangelogOutput {
                prev_tag,
                ..Default::default()
            });
        }

        let grouping = Classifier::new(self.config).group(prs);
        let body = Renderer::new(self.config).render(&grouping, &prev_tag, to_ref);
        info!("Rendered changelog with {} pull requests", grouping.count());

        Ok(ChangelogOutput {
            body,
            count: grouping.count(),
            prev_tag,
        })
    }

    /// Full run for `context`.
    ///
    /// A head ref outside `branch_pattern` yields empty outputs without any
    /// platform call. Otherwise the changelog is built and, when
    /// `post_comment` is set and the body is non-empty, synced to the pull
    /// request comment before the outputs are returned.
    pub async fn generate(
        &self,
        branch_pattern: &Regex,
        context: &RunContext,
        post_comment: bool,
    ) -> Result<ChangelogOutput> {
        if !branch_pattern.is_match(&context.head_ref) {
            info!("Ref \"{}\" does not match branch_pattern; skipping", context.head_ref);
            return Ok(ChangelogOutput::default());
        }

        let output = self.build(context.head_sha()?, &context.to_ref()).await?;

        if post_comment && !output.body.is_empty() {
            match context.pr_number {
                Some(number) => {
                    upsert_comment(self.platform, number, &output.body).await?;
                }
                None => info!("No pull_request context; skipping comment"),
            }
        }
        Ok(output)
    }
}
