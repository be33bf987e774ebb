pub mod types;

pub use types::{CategoryConfig, Layout, RawConfig, ResolvedConfig};

use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ChangelogError, Result};

/// Loads the configuration file at `path` and merges it over the defaults.
///
/// A missing or unreadable file yields the defaults. Content that fails to
/// parse is an error.
pub fn load(path: &Path) -> Result<ResolvedConfig> {
    if path.as_os_str().is_empty() {
        return Ok(ResolvedConfig::default());
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("Configuration not found at {}; using defaults", path.display());
            return Ok(ResolvedConfig::default());
        }
        Err(err) => {
            info!("Failed to read configuration at {}: {}", path.display(), err);
            return Ok(ResolvedConfig::default());
        }
    };

    let source = path.display().to_string();
    let parsed = parse(path, &raw).map_err(|message| ChangelogError::config(&source, message))?;
    debug!(?parsed, "parsed configuration overrides");

    ResolvedConfig::merge(parsed, &source)
}

fn parse(path: &Path, raw: &str) -> std::result::Result<RawConfig, String> {
    if raw.trim().is_empty() {
        return Ok(RawConfig::default());
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(raw).map_err(|e| e.to_string()),
        Some("toml") => toml::from_str(raw).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str::<Option<RawConfig>>(raw)
            .map(Option::unwrap_or_default)
            .map_err(|e| e.to_string()),
    }
}
