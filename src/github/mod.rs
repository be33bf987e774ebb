pub mod client;
pub mod platform;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use client::GitHubClient;
pub use platform::Platform;
pub use types::{PullRequest, Tag};
