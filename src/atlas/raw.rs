use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct RawNode {
    pub id: String,
    pub label: String,
    pub community: i64,
    pub weight: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Clone, Debug, Default)]
pub struct RawGraph {
    pub graph_version: Option<u64>,
    pub timestamp: Option<Value>,
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    pub skipped_nodes: usize,
    pub skipped_edges: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct NodeRecord {
    id: RawId,
    #[serde(default)]
    handle: Option<String>,
    #[serde(rename = "communityId")]
    community_id: i64,
    #[serde(default)]
    weight: Option<f64>,
}

#[derive(Deserialize)]
struct EdgeRecord {
    source: RawId,
    target: RawId,
    weight: f64,
}

fn parse_node(value: &Value) -> Option<RawNode> {
    let record = NodeRecord::deserialize(value).ok()?;
    let id = record.id.into_string();
    if id.is_empty() {
        return None;
    }

    let weight = match record.weight {
        Some(weight) if !weight.is_finite() || weight < 0.0 => return None,
        other => other,
    };
    let label = record
        .handle
        .map(|handle| handle.trim().to_string())
        .filter(|handle| !handle.is_empty())
        .unwrap_or_else(|| id.clone());

    Some(RawNode {
        id,
        label,
        community: record.community_id,
        weight,
    })
}

fn parse_edge(value: &Value) -> Option<RawEdge> {
    let record = EdgeRecord::deserialize(value).ok()?;
    if !record.weight.is_finite() || record.weight < 0.0 {
        return None;
    }

    let source = record.source.into_string();
    let target = record.target.into_string();
    if source.is_empty() || target.is_empty() {
        return None;
    }

    Some(RawEdge {
        source,
        target,
        weight: record.weight,
    })
}

pub fn parse_raw_graph(raw: &str) -> Result<RawGraph> {
    let parsed: Value = serde_json::from_str(raw).context("invalid graph JSON")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("graph JSON must be an object"))?;

    let node_values = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("graph JSON has no `nodes` array"))?;
    let edge_values = object
        .get("edges")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut graph = RawGraph {
        graph_version: object.get("graphVersion").and_then(Value::as_u64),
        timestamp: object.get("timestamp").cloned(),
        nodes: Vec::with_capacity(node_values.len()),
        edges: Vec::with_capacity(edge_values.len()),
        ..RawGraph::default()
    };

    for (position, value) in node_values.iter().enumerate() {
        match parse_node(value) {
            Some(node) => graph.nodes.push(node),
            None => {
                debug!(position, "skipping malformed node record");
                graph.skipped_nodes += 1;
            }
        }
    }

    for (position, value) in edge_values.iter().enumerate() {
        match parse_edge(value) {
            Some(edge) => graph.edges.push(edge),
            None => {
                debug!(position, "skipping malformed edge record");
                graph.skipped_edges += 1;
            }
        }
    }

    if graph.skipped_nodes > 0 || graph.skipped_edges > 0 {
        warn!(
            skipped_nodes = graph.skipped_nodes,
            skipped_edges = graph.skipped_edges,
            "graph input contained malformed records"
        );
    }

    Ok(graph)
}
