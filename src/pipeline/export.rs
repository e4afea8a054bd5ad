use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::clusters::{Cluster, ClusterRecord};
use super::graph::WorkingGraph;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub key: String,
    pub label: String,
    pub community: i64,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub area: f64,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactAttributes {
    pub layout: String,
    pub config_version: String,
    pub graph_version: Option<u64>,
    pub timestamp: Option<Value>,
    pub hidden_nodes: usize,
    pub total_weight: f64,
    pub clusters: IndexMap<i64, ClusterRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Artifact {
    pub attributes: ArtifactAttributes,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl Artifact {
    pub fn from_graph(
        graph: &WorkingGraph,
        clusters: &IndexMap<i64, Cluster>,
        attributes: ArtifactAttributes,
    ) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| NodeRecord {
                key: node.key.clone(),
                label: node.label.clone(),
                community: node.community,
                x: node.position.x,
                y: node.position.y,
                size: node.size,
                area: node.area,
                color: node.color.clone(),
            })
            .collect();
        let edges = graph
            .edges
            .iter()
            .map(|edge| EdgeRecord {
                source: graph.nodes[edge.source].key.clone(),
                target: graph.nodes[edge.target].key.clone(),
                weight: edge.weight,
            })
            .collect();

        let mut attributes = attributes;
        attributes.clusters = clusters
            .iter()
            .map(|(community, cluster)| (*community, cluster.record()))
            .collect();

        Self {
            attributes,
            nodes,
            edges,
        }
    }
}

pub fn artifact_path(output_dir: &Path, layout: &str) -> PathBuf {
    output_dir.join(format!("{layout}.json"))
}

/// Writes to a sibling temp file first so a failed write never leaves a
/// truncated artifact behind.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    let staging = path.with_extension("json.tmp");
    {
        let file = File::create(&staging)
            .with_context(|| format!("failed to create {}", staging.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, artifact).context("failed to encode artifact")?;
        writer
            .flush()
            .with_context(|| format!("failed to write {}", staging.display()))?;
    }
    fs::rename(&staging, path)
        .with_context(|| format!("failed to move artifact into {}", path.display()))
}
