use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionMarker {
    pub config_version: String,
    pub graph_version: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Regenerate(&'static str),
    Skip { rewrite_marker: bool },
}

pub fn marker_path(output_dir: &Path, layout: &str) -> PathBuf {
    output_dir.join(format!("{layout}.version.json"))
}

pub fn read_marker(path: &Path) -> Option<VersionMarker> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            debug!(path = %path.display(), %error, "no version marker");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(marker) => Some(marker),
        Err(error) => {
            debug!(path = %path.display(), %error, "unreadable version marker");
            None
        }
    }
}

pub fn write_marker(path: &Path, marker: &VersionMarker) -> Result<()> {
    let raw = serde_json::to_string_pretty(marker).context("failed to encode version marker")?;
    fs::write(path, raw)
        .with_context(|| format!("failed to write version marker {}", path.display()))
}

pub fn evaluate(
    marker: Option<&VersionMarker>,
    config_version: &Version,
    graph_version: Option<u64>,
) -> GateDecision {
    let Some(marker) = marker else {
        return GateDecision::Regenerate("no version marker");
    };
    let Some(graph_version) = graph_version else {
        return GateDecision::Regenerate("graph input carries no version");
    };
    let Ok(marked_config) = Version::parse(marker.config_version.trim()) else {
        return GateDecision::Regenerate("version marker holds an invalid config version");
    };

    if marker.graph_version < graph_version {
        return GateDecision::Regenerate("graph version advanced");
    }
    if (marked_config.major, marked_config.minor) < (config_version.major, config_version.minor) {
        return GateDecision::Regenerate("config version advanced");
    }

    GateDecision::Skip {
        rewrite_marker: marked_config != *config_version,
    }
}
