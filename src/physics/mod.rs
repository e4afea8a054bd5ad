mod forces;
mod quadtree;

use std::f64::consts::TAU;

use euclid::Angle;
use euclid::default::Rotation2D;

use forces::{
    accumulate_attraction, accumulate_exact_repulsion, accumulate_gravity,
    accumulate_repulsion_for_node, fallback_direction, step_size,
};
use quadtree::QuadNode;

pub type Vec2 = euclid::default::Vector2D<f64>;

pub fn vec2(x: f64, y: f64) -> Vec2 {
    euclid::vec2(x, y)
}

pub trait ForceGraph {
    fn node_count(&self) -> usize;
    fn position(&self, index: usize) -> Vec2;
    fn set_position(&mut self, index: usize, position: Vec2);
    fn weighted_edges(&self) -> Vec<(usize, usize, f64)>;

    fn is_fixed(&self, _index: usize) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutSettings {
    pub scaling_ratio: f64,
    pub gravity: f64,
    pub strong_gravity: bool,
    pub slow_down: f64,
    pub edge_weight_influence: f64,
    pub barnes_hut: bool,
    pub barnes_hut_theta: f64,
    pub convergence_threshold: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            scaling_ratio: 1.0,
            gravity: 1.0,
            strong_gravity: false,
            slow_down: 1.0,
            edge_weight_influence: 1.0,
            barnes_hut: false,
            barnes_hut_theta: 0.5,
            convergence_threshold: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutReport {
    pub iterations: usize,
    pub converged: bool,
    pub last_displacement: f64,
}

pub fn initialize<G: ForceGraph + ?Sized>(graph: &mut G) {
    let n = graph.node_count();
    for index in 0..n {
        let angle = (index as f64 / n as f64) * TAU;
        graph.set_position(index, vec2(angle.cos(), angle.sin()));
    }
}

pub fn infer_settings<G: ForceGraph + ?Sized>(graph: &G) -> LayoutSettings {
    let order = graph.node_count().max(1) as f64;
    LayoutSettings {
        scaling_ratio: 10.0,
        gravity: 0.05,
        strong_gravity: true,
        slow_down: 1.0 + order.ln(),
        barnes_hut: order > 2000.0,
        ..LayoutSettings::default()
    }
}

/// Runs exactly `iterations` integration steps. Convergence is only reported;
/// it never ends the run early.
pub fn run<G: ForceGraph + ?Sized>(
    graph: &mut G,
    settings: &LayoutSettings,
    iterations: usize,
) -> LayoutReport {
    let node_count = graph.node_count();
    let mut report = LayoutReport {
        iterations: 0,
        converged: false,
        last_displacement: 0.0,
    };
    if node_count == 0 {
        report.converged = true;
        return report;
    }

    let edges = graph.weighted_edges();
    let mut masses = vec![1.0; node_count];
    for &(from, to, _) in &edges {
        if from == to || from >= node_count || to >= node_count {
            continue;
        }
        masses[from] += 1.0;
        masses[to] += 1.0;
    }

    let fixed = (0..node_count)
        .map(|index| graph.is_fixed(index))
        .collect::<Vec<_>>();
    let mut positions = (0..node_count)
        .map(|index| graph.position(index))
        .collect::<Vec<_>>();
    for (index, position) in positions.iter_mut().enumerate() {
        if !position.x.is_finite() || !position.y.is_finite() {
            *position = fallback_direction(index);
        }
    }

    let mut forces = vec![Vec2::zero(); node_count];
    let mut previous = vec![Vec2::zero(); node_count];

    for _ in 0..iterations {
        forces.fill(Vec2::zero());

        if settings.barnes_hut {
            if let Some(tree) = QuadNode::build(&positions, &masses) {
                for (index, force) in forces.iter_mut().enumerate() {
                    accumulate_repulsion_for_node(
                        &tree,
                        index,
                        &positions,
                        &masses,
                        settings.scaling_ratio,
                        settings.barnes_hut_theta,
                        force,
                    );
                }
            }
        } else {
            accumulate_exact_repulsion(&positions, &masses, settings.scaling_ratio, &mut forces);
        }

        accumulate_gravity(
            &positions,
            &masses,
            settings.gravity,
            settings.strong_gravity,
            settings.scaling_ratio,
            &mut forces,
        );
        accumulate_attraction(
            &positions,
            &edges,
            settings.edge_weight_influence,
            &mut forces,
        );

        let mut displacement = 0.0;
        for index in 0..node_count {
            let force = forces[index];
            if fixed[index] || !force.x.is_finite() || !force.y.is_finite() {
                previous[index] = Vec2::zero();
                continue;
            }

            let step = step_size(masses[index], previous[index], force, settings.slow_down);
            let moved = force * step;
            positions[index] += moved;
            displacement += moved.length();
            previous[index] = force;
        }

        report.iterations += 1;
        report.last_displacement = displacement;
    }

    report.converged = report.last_displacement < settings.convergence_threshold;
    for (index, position) in positions.into_iter().enumerate() {
        graph.set_position(index, position);
    }
    report
}

pub fn rotate<G: ForceGraph + ?Sized>(graph: &mut G, angle: f64) {
    let node_count = graph.node_count();
    if node_count == 0 {
        return;
    }

    let mut centroid = Vec2::zero();
    for index in 0..node_count {
        centroid += graph.position(index);
    }
    centroid /= node_count as f64;

    let rotation = Rotation2D::new(Angle::radians(angle));
    for index in 0..node_count {
        let offset = graph.position(index) - centroid;
        graph.set_position(index, centroid + rotation.transform_vector(offset));
    }
}
