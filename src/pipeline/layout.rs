use tracing::{info, warn};

use super::anchor::CommunityLocations;
use super::graph::WorkingGraph;
use crate::atlas::LayoutConfig;
use crate::physics::{self, ForceGraph, LayoutReport, LayoutSettings};

const SEED_SPREAD: f64 = 10.0;
const ANCHOR_PULL: f64 = 2.0;

pub fn engine_settings<G: ForceGraph + ?Sized>(graph: &G, gravity_strength: f64) -> LayoutSettings {
    LayoutSettings {
        barnes_hut: gravity_strength > 0.0,
        barnes_hut_theta: gravity_strength,
        convergence_threshold: 0.001 * graph.node_count() as f64,
        ..physics::infer_settings(graph)
    }
}

pub fn seed_positions(graph: &mut WorkingGraph, anchors: Option<&CommunityLocations>) {
    physics::initialize(graph);
    let Some(anchors) = anchors else {
        return;
    };

    for node in &mut graph.nodes {
        let offset = anchors
            .get(&node.community)
            .copied()
            .unwrap_or_default();
        node.position = node.position * SEED_SPREAD + offset * ANCHOR_PULL;
    }
}

pub fn simulate(
    graph: &mut WorkingGraph,
    layout: &LayoutConfig,
    anchors: Option<&CommunityLocations>,
) -> LayoutReport {
    seed_positions(graph, anchors);

    let settings = engine_settings(graph, layout.gravity_strength);
    let report = physics::run(graph, &settings, layout.iteration_count);
    if !report.converged {
        warn!(
            iterations = report.iterations,
            displacement = report.last_displacement,
            threshold = settings.convergence_threshold,
            "layout did not converge; keeping final positions"
        );
    }

    if layout.rotate {
        physics::rotate(graph, layout.rotation_angle);
    }

    info!(
        nodes = graph.node_count(),
        iterations = report.iterations,
        barnes_hut = settings.barnes_hut,
        "simulated layout"
    );
    report
}
