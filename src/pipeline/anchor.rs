use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::clusters::{NO_COMMUNITY, RepresentativeChoice, offer_representative};
use super::graph::WorkingGraph;
use super::layout::engine_settings;
use crate::atlas::{LayoutConfig, RepresentativeTable};
use crate::physics::{self, ForceGraph, Vec2, vec2};

pub type CommunityLocations = HashMap<i64, Vec2>;

#[derive(Clone, Debug, PartialEq)]
pub struct MetaNode {
    pub community: i64,
    pub label: String,
    pub position: Vec2,
    pub fixed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct MetaGraph {
    pub nodes: Vec<MetaNode>,
    pub edges: Vec<(usize, usize, f64)>,
}

impl ForceGraph for MetaGraph {
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
        self.edges.clone()
    }

    fn is_fixed(&self, index: usize) -> bool {
        self.nodes[index].fixed
    }
}

pub fn build_meta_graph(graph: &WorkingGraph, representatives: &RepresentativeTable) -> MetaGraph {
    let mut slots: IndexMap<i64, Option<RepresentativeChoice>> = IndexMap::new();
    for node in &graph.nodes {
        if node.community == NO_COMMUNITY {
            continue;
        }
        let choice = slots.entry(node.community).or_default();
        if let Some(candidate) = representatives.get(&node.label) {
            offer_representative(choice, candidate);
        }
    }

    let mut sums: IndexMap<(usize, usize), f64> = IndexMap::new();
    for edge in &graph.edges {
        let source = graph.nodes[edge.source].community;
        let target = graph.nodes[edge.target].community;
        if source == target {
            continue;
        }
        let (Some(source), Some(target)) = (slots.get_index_of(&source), slots.get_index_of(&target))
        else {
            continue;
        };
        *sums.entry((source, target)).or_insert(0.0) += edge.weight;
    }

    let edges = sums
        .into_iter()
        .filter_map(|((source, target), sum)| {
            if sum > 0.0 {
                Some((source, target, sum.ln()))
            } else {
                debug!(source, target, "dropping zero-weight meta edge");
                None
            }
        })
        .collect::<Vec<_>>();

    let nodes = slots
        .into_iter()
        .map(|(community, choice)| MetaNode {
            community,
            label: choice.map(|choice| choice.label).unwrap_or_default(),
            position: Vec2::zero(),
            fixed: false,
        })
        .collect();

    MetaGraph { nodes, edges }
}

pub fn locate_communities(
    graph: &WorkingGraph,
    representatives: &RepresentativeTable,
    layout: &LayoutConfig,
) -> CommunityLocations {
    let mut meta = build_meta_graph(graph, representatives);
    physics::initialize(&mut meta);

    let mut pinned = 0usize;
    for node in &mut meta.nodes {
        if let Some(&[x, y]) = layout.anchor_pins.get(&node.label) {
            node.position = vec2(x, y);
            node.fixed = true;
            pinned += 1;
        }
    }
    if pinned < layout.anchor_pins.len() {
        warn!(
            configured = layout.anchor_pins.len(),
            pinned, "some anchor pins matched no community"
        );
    }

    let settings = engine_settings(&meta, layout.gravity_strength);
    let report = physics::run(&mut meta, &settings, layout.iteration_count);
    info!(
        communities = meta.nodes.len(),
        meta_edges = meta.edges.len(),
        pinned,
        converged = report.converged,
        "laid out anchor graph"
    );

    meta.nodes
        .into_iter()
        .map(|node| (node.community, node.position))
        .collect()
}
