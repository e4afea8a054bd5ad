use std::f64::consts::PI;

use indexmap::IndexMap;
use tracing::info;

use super::graph::WorkingGraph;
use crate::atlas::{LayoutConfig, SizingMode};
use crate::util::{round_to, stable_slot};

pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

pub fn harmonic_mean(incoming: f64, outgoing: f64) -> f64 {
    let sum = incoming + outgoing;
    if sum > 0.0 {
        2.0 * incoming * outgoing / sum
    } else {
        0.0
    }
}

pub fn harmonic_score(graph: &WorkingGraph, node: usize) -> f64 {
    let mut incoming = IndexMap::new();
    for &edge_id in graph.incoming(node) {
        let edge = &graph.edges[edge_id];
        if edge.source != node {
            incoming.entry(edge.source).or_insert(edge.weight);
        }
    }

    let mut outgoing = IndexMap::new();
    for &edge_id in graph.outgoing(node) {
        let edge = &graph.edges[edge_id];
        if edge.target != node {
            outgoing.entry(edge.target).or_insert(edge.weight);
        }
    }

    incoming
        .iter()
        .filter_map(|(neighbor, &in_weight)| {
            outgoing
                .get(neighbor)
                .map(|&out_weight| harmonic_mean(in_weight, out_weight).ln_1p())
        })
        .sum()
}

pub fn size_for(score: f64, layout: &LayoutConfig) -> f64 {
    let ratio = (score.max(0.0) / layout.historical_max_weight_sum).min(1.0);
    let size = layout.min_size + ratio.sqrt() * (layout.max_size - layout.min_size);
    round_to(size, 2)
}

pub fn palette_color(seed: u64, counter: usize) -> &'static str {
    PALETTE[stable_slot(seed, counter as u64, PALETTE.len())]
}

pub fn apply_sizing(graph: &mut WorkingGraph, layout: &LayoutConfig) -> Option<WeightRange> {
    let scores = (0..graph.node_count())
        .map(|node| match layout.sizing {
            SizingMode::Harmonic => harmonic_score(graph, node),
            SizingMode::Declarative => graph.nodes[node].weight.unwrap_or(0.0),
        })
        .collect::<Vec<_>>();

    let mut range: Option<WeightRange> = None;
    for (index, (node, score)) in graph.nodes.iter_mut().zip(scores).enumerate() {
        node.size = size_for(score, layout);
        node.area = PI * (node.size / 2.0).powi(2);
        node.color = match layout.sizing {
            SizingMode::Harmonic => palette_color(layout.color_seed, index).to_string(),
            SizingMode::Declarative => layout
                .community_colors
                .get(&node.community)
                .unwrap_or(&layout.default_color)
                .clone(),
        };

        range = Some(match range {
            Some(current) => WeightRange {
                min: current.min.min(score),
                max: current.max.max(score),
            },
            None => WeightRange {
                min: score,
                max: score,
            },
        });
    }

    if let Some(range) = range {
        info!(
            mode = ?layout.sizing,
            min_weight = range.min,
            max_weight = range.max,
            normalization = layout.historical_max_weight_sum,
            "sized nodes"
        );
    }
    range
}
