use super::quadtree::QuadNode;
use super::{Vec2, vec2};

const MIN_DISTANCE_SQ: f64 = 1e-9;

fn repulsion_between(point_a: Vec2, mass_a: f64, point_b: Vec2, mass_b: f64, scaling: f64) -> Vec2 {
    let delta = point_a - point_b;
    let distance_sq = delta.square_length();
    if distance_sq < MIN_DISTANCE_SQ {
        return Vec2::zero();
    }
    delta * (scaling * mass_a * mass_b / distance_sq)
}

pub(super) fn accumulate_exact_repulsion(
    positions: &[Vec2],
    masses: &[f64],
    scaling: f64,
    forces: &mut [Vec2],
) {
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let push = repulsion_between(positions[i], masses[i], positions[j], masses[j], scaling);
            forces[i] += push;
            forces[j] -= push;
        }
    }
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    masses: &[f64],
    scaling: f64,
    theta: f64,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            *force += repulsion_between(
                point,
                masses[index],
                positions[other_index],
                masses[other_index],
                scaling,
            );
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.square_length().max(MIN_DISTANCE_SQ);
    let distance = distance_sq.sqrt();
    let can_approximate =
        !node.bounds.contains(point) && (node.bounds.side_length() / distance) < theta;

    if can_approximate {
        *force += delta * (scaling * masses[index] * node.mass / distance_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, masses, scaling, theta, force);
    }
}

pub(super) fn accumulate_attraction(
    positions: &[Vec2],
    edges: &[(usize, usize, f64)],
    weight_influence: f64,
    forces: &mut [Vec2],
) {
    let node_count = positions.len();
    for &(from, to, weight) in edges {
        if from >= node_count || to >= node_count || from == to {
            continue;
        }

        let coefficient = if weight_influence == 0.0 {
            1.0
        } else if weight_influence == 1.0 {
            weight
        } else {
            weight.powf(weight_influence)
        }
        .max(0.0);

        let delta = positions[from] - positions[to];
        let pull = delta * coefficient;
        forces[from] -= pull;
        forces[to] += pull;
    }
}

pub(super) fn accumulate_gravity(
    positions: &[Vec2],
    masses: &[f64],
    gravity: f64,
    strong: bool,
    scaling: f64,
    forces: &mut [Vec2],
) {
    if gravity <= 0.0 {
        return;
    }

    for (index, force) in forces.iter_mut().enumerate() {
        let point = positions[index];
        let distance = point.length();
        if distance < 1e-9 {
            continue;
        }

        let factor = if strong {
            scaling * masses[index] * gravity
        } else {
            masses[index] * gravity / distance
        };
        *force -= point * factor;
    }
}

pub(super) fn step_size(mass: f64, previous: Vec2, current: Vec2, slow_down: f64) -> f64 {
    let swinging = mass * (previous - current).length();
    let traction = (previous + current).length() * 0.5;
    let speed = (0.1 * (1.0 + traction).ln()) / (1.0 + swinging.sqrt());
    speed / slow_down
}

pub(super) fn fallback_direction(index: usize) -> Vec2 {
    let angle = ((index as f64) * 0.618_034 + 0.37) * std::f64::consts::TAU;
    vec2(angle.cos(), angle.sin())
}
