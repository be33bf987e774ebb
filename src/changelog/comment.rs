use tracing::info;

use crate::error::Result;
use crate::github::Platform;

/// Hidden token identifying the comment this tool owns on a pull request.
pub const COMMENT_MARKER: &str = "<!-- tag-release-bridge -->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(u64),
    Updated(u64),
}

/// Creates the marked comment on `issue`, or replaces the body of the first
/// existing comment carrying the marker.
pub async fn upsert_comment(platform: &dyn Platform, issue: u64, body: &str) -> Result<SyncOutcome> {
    let marked_body = format!("{COMMENT_MARKER}\n{body}");
    let comments = platform.list_comments(issue).await?;

    match comments.iter().find(|c| c.body.contains(COMMENT_MARKER)) {
        Some(existing) => {
            platform.update_comment(existing.id, &marked_body).await?;
            info!("Updated existing comment (id: {})", existing.id);
            Ok(SyncOutcome::Updated(existing.id))
        }
        None => {
            let created = platform.create_comment(issue, &marked_body).await?;
            info!("Created new comment (id: {})", created.id);
            Ok(SyncOutcome::Created(created.id))
        }
    }
}
