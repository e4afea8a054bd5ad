use std::cmp::Ordering;

use tracing::info;

use super::graph::WorkingGraph;
use crate::atlas::LayoutConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub stay: usize,
    pub dropped: usize,
    pub kept: usize,
}

fn by_weight_desc(graph: &WorkingGraph) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    move |&a, &b| {
        graph.edges[b]
            .weight
            .total_cmp(&graph.edges[a].weight)
            .then(a.cmp(&b))
    }
}

pub fn mark_stay_edges(graph: &mut WorkingGraph, keep: usize) {
    let mut stay = vec![false; graph.edge_count()];
    let mut incident = Vec::new();

    for node in 0..graph.node_count() {
        incident.clear();
        incident.extend_from_slice(graph.outgoing(node));
        incident.extend_from_slice(graph.incoming(node));
        incident.sort_unstable();
        incident.dedup();
        incident.sort_by(by_weight_desc(graph));

        for &edge in incident.iter().take(keep) {
            stay[edge] = true;
        }
    }

    for (edge, stay) in graph.edges.iter_mut().zip(stay) {
        edge.stay |= stay;
    }
}

pub fn prune_edges(graph: &mut WorkingGraph, layout: &LayoutConfig) -> PruneStats {
    mark_stay_edges(graph, layout.non_removable_edge_count);

    let mut keep = vec![true; graph.edge_count()];
    let mut outbound = Vec::new();
    for node in 0..graph.node_count() {
        let cap = layout.outbound_cap_for(&graph.nodes[node].label);
        outbound.clear();
        outbound.extend_from_slice(graph.outgoing(node));
        outbound.sort_by(by_weight_desc(graph));

        for &edge in outbound.iter().skip(cap) {
            if !graph.edges[edge].stay {
                keep[edge] = false;
            }
        }
    }

    let stats = PruneStats {
        stay: graph.edges.iter().filter(|edge| edge.stay).count(),
        dropped: keep.iter().filter(|kept| !**kept).count(),
        kept: keep.iter().filter(|kept| **kept).count(),
    };
    graph.retain_edges(&keep);

    info!(
        kept = stats.kept,
        dropped = stats.dropped,
        stay = stats.stay,
        "pruned edges"
    );
    stats
}
