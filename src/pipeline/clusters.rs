use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use super::graph::WorkingGraph;
use crate::atlas::{Representative, RepresentativeTable};
use crate::physics::{Vec2, vec2};
use crate::util::round_to;

pub const NO_COMMUNITY: i64 = -1;

const SIGMA_LIMIT: f64 = 2.0;
const MAD_TO_SIGMA: f64 = 1.4826;
const SIGMA_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct RepresentativeChoice {
    pub label: String,
    pub display_name: String,
    pub priority: i64,
}

pub fn offer_representative(current: &mut Option<RepresentativeChoice>, candidate: &Representative) {
    let replace = match current {
        None => true,
        Some(choice) => candidate.priority > choice.priority,
    };
    if replace {
        *current = Some(RepresentativeChoice {
            label: candidate.assigned_cluster_label.clone(),
            display_name: candidate
                .display_name
                .clone()
                .unwrap_or_else(|| candidate.assigned_cluster_label.clone()),
            priority: candidate.priority,
        });
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cluster {
    pub community: i64,
    pub size: usize,
    pub representative: Option<RepresentativeChoice>,
    pub position: Option<Vec2>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub label: String,
    pub display_name: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub size: usize,
}

impl Cluster {
    pub fn record(&self) -> ClusterRecord {
        let (label, display_name) = match &self.representative {
            Some(choice) => (choice.label.clone(), choice.display_name.clone()),
            None => (String::new(), String::new()),
        };
        ClusterRecord {
            label,
            display_name,
            x: self.position.map(|position| position.x),
            y: self.position.map(|position| position.y),
            size: self.size,
        }
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let middle = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[middle - 1] + values[middle]) / 2.0
    } else {
        values[middle]
    }
}

// Median and scaled MAD per axis. When half the values coincide the MAD is
// zero, so fall back to the mean and population sigma.
fn center_and_sigma(mut values: Vec<f64>) -> (f64, f64) {
    let center = median(&mut values);
    let mut deviations = values
        .iter()
        .map(|value| (value - center).abs())
        .collect::<Vec<_>>();
    let mad = median(&mut deviations);
    if mad > 0.0 {
        return (center, MAD_TO_SIGMA * mad);
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;
    (mean, variance.sqrt())
}

pub fn trimmed_barycenter(positions: &[Vec2]) -> Option<Vec2> {
    if positions.is_empty() {
        return None;
    }

    let (center_x, sigma_x) = center_and_sigma(positions.iter().map(|p| p.x).collect());
    let (center_y, sigma_y) = center_and_sigma(positions.iter().map(|p| p.y).collect());
    let limit_x = SIGMA_LIMIT * sigma_x + SIGMA_TOLERANCE;
    let limit_y = SIGMA_LIMIT * sigma_y + SIGMA_TOLERANCE;

    let mut sum = Vec2::zero();
    let mut kept = 0usize;
    for position in positions {
        if (position.x - center_x).abs() <= limit_x && (position.y - center_y).abs() <= limit_y {
            sum += *position;
            kept += 1;
        }
    }

    if kept == 0 {
        return None;
    }
    let center = sum / kept as f64;
    Some(vec2(round_to(center.x, 2), round_to(center.y, 2)))
}

pub fn collect_clusters(
    graph: &WorkingGraph,
    representatives: &RepresentativeTable,
) -> IndexMap<i64, Cluster> {
    let mut clusters: IndexMap<i64, Cluster> = IndexMap::new();

    for node in &graph.nodes {
        if node.community == NO_COMMUNITY {
            continue;
        }

        let cluster = clusters.entry(node.community).or_insert_with(|| Cluster {
            community: node.community,
            ..Cluster::default()
        });
        cluster.size += 1;

        if let Some(candidate) = representatives.get(&node.label) {
            offer_representative(&mut cluster.representative, candidate);
        }
    }

    clusters
}

pub fn place_clusters(graph: &WorkingGraph, clusters: &mut IndexMap<i64, Cluster>) {
    let mut buffers: IndexMap<i64, Vec<Vec2>> = IndexMap::with_capacity(clusters.len());
    for node in &graph.nodes {
        if clusters.contains_key(&node.community) {
            buffers.entry(node.community).or_default().push(node.position);
        }
    }

    let mut unplaced = 0usize;
    for cluster in clusters.values_mut() {
        cluster.position = buffers
            .get(&cluster.community)
            .and_then(|positions| trimmed_barycenter(positions));
        if cluster.position.is_none() {
            debug!(community = cluster.community, "cluster left unplaced");
            unplaced += 1;
        }
    }

    info!(clusters = clusters.len(), unplaced, "aggregated clusters");
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::pipeline::graph::load_nodes;
    use crate::pipeline::graph::tests::node;

    fn rep(label: &str, priority: i64) -> Representative {
        Representative {
            assigned_cluster_label: label.to_string(),
            priority,
            display_name: None,
        }
    }

    #[test]
    fn outlier_is_trimmed_from_barycenter() {
        let positions = [vec2(0.0, 0.0), vec2(2.0, 0.0), vec2(0.0, 2.0), vec2(100.0, 100.0)];
        assert_eq!(trimmed_barycenter(&positions), Some(vec2(0.67, 0.67)));
    }

    #[test]
    fn small_clusters_keep_every_member() {
        assert_eq!(
            trimmed_barycenter(&[vec2(0.0, 0.0), vec2(4.0, -2.0)]),
            Some(vec2(2.0, -1.0))
        );
        assert_eq!(trimmed_barycenter(&[vec2(3.333, 1.0)]), Some(vec2(3.33, 1.0)));
    }

    #[test]
    fn shared_coordinate_keeps_members_within_population_sigma() {
        let positions = [
            vec2(0.0, 0.0),
            vec2(0.0, 1.0),
            vec2(0.0, 2.0),
            vec2(1.0, 3.0),
            vec2(2.0, 4.0),
        ];
        assert_eq!(trimmed_barycenter(&positions), Some(vec2(0.6, 2.0)));

        let positions = [vec2(5.0, 5.0), vec2(5.0, 5.0), vec2(5.0, 5.0), vec2(9.0, 5.0)];
        assert_eq!(trimmed_barycenter(&positions), Some(vec2(6.0, 5.0)));
    }

    #[test]
    fn identical_positions_survive_zero_sigma() {
        let positions = [vec2(0.1, 0.7); 3];
        assert_eq!(trimmed_barycenter(&positions), Some(vec2(0.1, 0.7)));
        assert_eq!(trimmed_barycenter(&[]), None);
    }

    #[test]
    fn higher_priority_replaces_equal_does_not() {
        let mut current = None;
        offer_representative(&mut current, &rep("First", 2));
        offer_representative(&mut current, &rep("Tie", 2));
        assert_eq!(current.as_ref().map(|c| c.label.as_str()), Some("First"));

        offer_representative(&mut current, &rep("Higher", 3));
        offer_representative(&mut current, &rep("Lower", 1));
        let choice = current.expect("choice");
        assert_eq!(choice.label, "Higher");
        assert_eq!(choice.display_name, "Higher");
    }

    #[test]
    fn equal_priority_tie_break_follows_input_order() {
        let table = RepresentativeTable::from_iter([
            ("x".to_string(), rep("Xs", 1)),
            ("y".to_string(), rep("Ys", 1)),
        ]);

        let forward = load_nodes(&[node("x", 1), node("y", 1)], &HashSet::new());
        let reversed = load_nodes(&[node("y", 1), node("x", 1)], &HashSet::new());

        let forward = collect_clusters(&forward.graph, &table);
        let reversed = collect_clusters(&reversed.graph, &table);

        assert_eq!(forward[&1].record().label, "Xs");
        assert_eq!(reversed[&1].record().label, "Ys");
    }

    #[test]
    fn clusters_count_members_and_skip_no_community() {
        let nodes = [node("a", 3), node("b", 3), node("c", NO_COMMUNITY), node("d", 5)];
        let mut loaded = load_nodes(&nodes, &HashSet::new());
        loaded.graph.nodes[0].position = vec2(1.0, 1.0);
        loaded.graph.nodes[1].position = vec2(3.0, 3.0);
        loaded.graph.nodes[3].position = vec2(-4.0, 8.0);

        let mut clusters = collect_clusters(&loaded.graph, &RepresentativeTable::default());
        place_clusters(&loaded.graph, &mut clusters);

        assert_eq!(clusters.keys().copied().collect::<Vec<_>>(), [3, 5]);
        assert_eq!(clusters[&3].size, 2);
        assert_eq!(clusters[&3].position, Some(vec2(2.0, 2.0)));
        assert_eq!(clusters[&5].position, Some(vec2(-4.0, 8.0)));

        let record = clusters[&5].record();
        assert_eq!(record.label, "");
        assert_eq!((record.x, record.y), (Some(-4.0), Some(8.0)));
    }
}
