use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use semver::Version;
use serde::Deserialize;

use crate::error::AtlasError;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    #[default]
    Harmonic,
    Declarative,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Representative {
    pub assigned_cluster_label: String,
    pub priority: i64,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct RepresentativeTable(HashMap<String, Representative>);

impl RepresentativeTable {
    pub fn get(&self, label: &str) -> Option<&Representative> {
        self.0.get(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, Representative)> for RepresentativeTable {
    fn from_iter<I: IntoIterator<Item = (String, Representative)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub input: String,
    pub iteration_count: usize,
    pub gravity_strength: f64,
    pub rotate: bool,
    pub rotation_angle: f64,
    pub anchor_enabled: bool,
    pub anchor_pins: HashMap<String, [f64; 2]>,
    pub sizing: SizingMode,
    pub min_size: f64,
    pub max_size: f64,
    pub historical_max_weight_sum: f64,
    pub community_colors: HashMap<i64, String>,
    pub default_color: String,
    pub color_seed: u64,
    pub non_removable_edge_count: usize,
    pub default_outbound_edge_cap: usize,
    pub focus_outbound_edge_cap: usize,
    pub focus_labels: HashSet<String>,
    pub per_label_edge_cap_overrides: HashMap<String, usize>,
    pub excluded_communities: HashSet<i64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            input: "graph.json".to_string(),
            iteration_count: 600,
            gravity_strength: 0.5,
            rotate: false,
            rotation_angle: 0.0,
            anchor_enabled: false,
            anchor_pins: HashMap::new(),
            sizing: SizingMode::Harmonic,
            min_size: 1.5,
            max_size: 20.0,
            historical_max_weight_sum: 500.0,
            community_colors: HashMap::new(),
            default_color: "#9e9e9e".to_string(),
            color_seed: 0,
            non_removable_edge_count: 3,
            default_outbound_edge_cap: 10,
            focus_outbound_edge_cap: 30,
            focus_labels: HashSet::new(),
            per_label_edge_cap_overrides: HashMap::new(),
            excluded_communities: HashSet::new(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        ensure!(
            !self.input.trim().is_empty(),
            "layout `{name}`: input file name is empty"
        );
        ensure!(
            self.min_size.is_finite() && self.min_size >= 0.0,
            "layout `{name}`: minSize must be a non-negative number"
        );
        ensure!(
            self.max_size.is_finite() && self.max_size >= self.min_size,
            "layout `{name}`: maxSize must be at least minSize"
        );
        ensure!(
            self.historical_max_weight_sum.is_finite() && self.historical_max_weight_sum > 0.0,
            "layout `{name}`: historicalMaxWeightSum must be positive"
        );
        ensure!(
            self.gravity_strength.is_finite() && self.gravity_strength >= 0.0,
            "layout `{name}`: gravityStrength must be a non-negative number"
        );
        ensure!(
            self.rotation_angle.is_finite(),
            "layout `{name}`: rotationAngle must be finite"
        );
        Ok(())
    }

    pub fn outbound_cap_for(&self, label: &str) -> usize {
        if let Some(&cap) = self.per_label_edge_cap_overrides.get(label) {
            return cap;
        }
        if self.focus_labels.contains(label) {
            self.focus_outbound_edge_cap
        } else {
            self.default_outbound_edge_cap
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasConfig {
    pub version: String,
    #[serde(default)]
    pub layouts: IndexMap<String, LayoutConfig>,
    #[serde(default)]
    pub representatives: RepresentativeTable,
}

impl AtlasConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("config is not valid JSON")?;
        config.config_version()?;
        Ok(config)
    }

    pub fn config_version(&self) -> Result<Version, AtlasError> {
        Version::parse(self.version.trim())
            .map_err(|_| AtlasError::InvalidConfigVersion(self.version.clone()))
    }

    pub fn layout(&self, name: &str) -> Result<&LayoutConfig, AtlasError> {
        self.layouts
            .get(name)
            .ok_or_else(|| AtlasError::UnknownLayout(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r##"{
        "version": "2.3.1",
        "layouts": {
            "main": {
                "input": "atlas.json",
                "anchorEnabled": true,
                "anchorPins": {"Tech": [0, 100]},
                "excludedCommunities": [4, 9],
                "focusLabels": ["hub.test"],
                "perLabelEdgeCapOverrides": {"loud.test": 1},
                "sizing": "declarative",
                "communityColors": {"3": "#ff0000"}
            },
            "bare": {}
        },
        "representatives": {
            "alice.test": {"assignedClusterLabel": "Tech", "priority": 5, "displayName": "Tech people"}
        }
    }"##;

    #[test]
    fn parses_layouts_with_defaults() {
        let config = AtlasConfig::parse(CONFIG).expect("config");
        let main = config.layout("main").expect("main");
        let bare = config.layout("bare").expect("bare");

        assert_eq!(config.config_version().expect("version"), Version::new(2, 3, 1));
        assert!(main.anchor_enabled);
        assert_eq!(main.anchor_pins["Tech"], [0.0, 100.0]);
        assert!(main.excluded_communities.contains(&9));
        assert_eq!(main.sizing, SizingMode::Declarative);
        assert_eq!(main.community_colors[&3], "#ff0000");
        assert_eq!(bare.input, "graph.json");
        assert_eq!(bare.sizing, SizingMode::Harmonic);
        assert_eq!(config.representatives.get("alice.test").map(|r| r.priority), Some(5));
        assert!(main.validate("main").is_ok());
    }

    #[test]
    fn outbound_cap_prefers_override_then_focus() {
        let config = AtlasConfig::parse(CONFIG).expect("config");
        let main = config.layout("main").expect("main");

        assert_eq!(main.outbound_cap_for("loud.test"), 1);
        assert_eq!(main.outbound_cap_for("hub.test"), 30);
        assert_eq!(main.outbound_cap_for("anyone"), 10);
    }

    #[test]
    fn unknown_layout_and_bad_version_are_reported() {
        let config = AtlasConfig::parse(CONFIG).expect("config");
        assert!(matches!(
            config.layout("nope"),
            Err(AtlasError::UnknownLayout(name)) if name == "nope"
        ));
        assert!(AtlasConfig::parse(r#"{"version": "two"}"#).is_err());
    }

    #[test]
    fn rejects_inverted_size_range() {
        let layout = LayoutConfig {
            min_size: 10.0,
            max_size: 2.0,
            ..LayoutConfig::default()
        };
        assert!(layout.validate("broken").is_err());
    }
}
