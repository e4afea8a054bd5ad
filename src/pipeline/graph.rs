use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::atlas::{RawEdge, RawNode};
use crate::physics::{ForceGraph, Vec2};

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub key: String,
    pub label: String,
    pub community: i64,
    pub weight: Option<f64>,
    pub size: f64,
    pub area: f64,
    pub color: String,
    pub position: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
    pub stay: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Visible(usize),
    Hidden,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub slot: Slot,
    pub community: i64,
}

#[derive(Clone, Debug, Default)]
pub struct NodeIndex(HashMap<String, IndexEntry>);

impl NodeIndex {
    pub fn get(&self, id: &str) -> Option<IndexEntry> {
        self.0.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Directed multigraph. Node order is input order after filtering and is
/// load-bearing: representative tie-breaks and palette colors depend on it.
#[derive(Clone, Debug, Default)]
pub struct WorkingGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl WorkingGraph {
    pub fn add_node(&mut self, raw: &RawNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            key: raw.id.clone(),
            label: raw.label.clone(),
            community: raw.community,
            weight: raw.weight,
            size: 0.0,
            area: 0.0,
            color: String::new(),
            position: Vec2::zero(),
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        index
    }

    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) -> usize {
        let index = self.edges.len();
        self.edges.push(Edge {
            source,
            target,
            weight,
            stay: false,
        });
        self.outgoing[source].push(index);
        self.incoming[target].push(index);
        index
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    pub fn incoming(&self, node: usize) -> &[usize] {
        &self.incoming[node]
    }

    pub fn retain_edges(&mut self, keep: &[bool]) {
        let edges = std::mem::take(&mut self.edges);
        for list in self.outgoing.iter_mut().chain(self.incoming.iter_mut()) {
            list.clear();
        }

        for (edge, kept) in edges.into_iter().zip(keep.iter().copied()) {
            if kept {
                self.add_edge(edge.source, edge.target, edge.weight);
                if let Some(last) = self.edges.last_mut() {
                    last.stay = edge.stay;
                }
            }
        }
    }
}

impl ForceGraph for WorkingGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn position(&self, index: usize) -> Vec2 {
        self.nodes[index].position
    }

    fn set_position(&mut self, index: usize, position: Vec2) {
        self.nodes[index].position = position;
    }

    fn weighted_edges(&self) -> Vec<(usize, usize, f64)> {
        self.edges
            .iter()
            .map(|edge| (edge.source, edge.target, edge.weight))
            .collect()
    }
}

pub struct LoadedGraph {
    pub graph: WorkingGraph,
    pub hidden: HashSet<String>,
    pub index: NodeIndex,
}

pub fn load_nodes(raw_nodes: &[RawNode], excluded: &HashSet<i64>) -> LoadedGraph {
    let mut graph = WorkingGraph::default();
    let mut hidden = HashSet::new();
    let mut index = NodeIndex(HashMap::with_capacity(raw_nodes.len()));
    let mut duplicates = 0usize;

    for raw in raw_nodes {
        if raw.id.is_empty() {
            warn!("skipping node with empty id");
            continue;
        }
        if index.0.contains_key(&raw.id) {
            debug!(id = %raw.id, "skipping duplicate node id");
            duplicates += 1;
            continue;
        }

        let slot = if excluded.contains(&raw.community) {
            hidden.insert(raw.id.clone());
            Slot::Hidden
        } else {
            Slot::Visible(graph.add_node(raw))
        };
        index.0.insert(
            raw.id.clone(),
            IndexEntry {
                slot,
                community: raw.community,
            },
        );
    }

    if duplicates > 0 {
        warn!(duplicates, "input repeated node ids; kept first occurrences");
    }
    info!(
        indexed = index.len(),
        visible = graph.node_count(),
        hidden = hidden.len(),
        "loaded nodes"
    );

    LoadedGraph {
        graph,
        hidden,
        index,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeTotals {
    pub inserted: usize,
    pub total_weight: f64,
    pub hidden_skipped: usize,
    pub unknown_skipped: usize,
}

pub fn aggregate_edges(
    graph: &mut WorkingGraph,
    index: &NodeIndex,
    raw_edges: &[RawEdge],
) -> EdgeTotals {
    let mut totals = EdgeTotals::default();

    for raw in raw_edges {
        let (Some(source), Some(target)) = (index.get(&raw.source), index.get(&raw.target)) else {
            debug!(source = %raw.source, target = %raw.target, "edge references unknown node");
            totals.unknown_skipped += 1;
            continue;
        };

        match (source.slot, target.slot) {
            (Slot::Visible(source), Slot::Visible(target)) => {
                graph.add_edge(source, target, raw.weight);
                totals.inserted += 1;
                totals.total_weight += raw.weight;
            }
            _ => {
                debug!(
                    source_community = source.community,
                    target_community = target.community,
                    "edge touches a hidden node"
                );
                totals.hidden_skipped += 1;
            }
        }
    }

    if totals.unknown_skipped > 0 {
        warn!(
            dropped = totals.unknown_skipped,
            "dropped edges referencing unknown nodes"
        );
    }
    info!(
        inserted = totals.inserted,
        hidden_skipped = totals.hidden_skipped,
        total_weight = totals.total_weight,
        "aggregated edges"
    );
    totals
}
