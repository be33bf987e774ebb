use tracing::{debug, info};

use crate::error::Result;
use crate::github::{Platform, Tag};

/// Returns the first tag in `tags` that is an ancestor of, or equal to, `head`.
///
/// Tags are checked strictly in the given order and the scan stops at the
/// first match, so the caller's ordering decides which tag is "nearest".
pub async fn locate_previous_tag(
    platform: &dyn Platform,
    tags: &[Tag],
    head: &str,
) -> Result<Option<String>> {
    for tag in tags {
        let status = platform.compare_status(&tag.name, head).await?;
        debug!(tag = %tag.name, ?status, "compared tag with head");

        if status.contains_base() {
            info!("Previous tag for {} is {}", head, tag.name);
            return Ok(Some(tag.name.clone()));
        }
    }

    info!("No reachable tag found from head \"{}\"; skipping comparison", head);
    Ok(None)
}
