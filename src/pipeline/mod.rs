mod anchor;
mod clusters;
mod export;
mod graph;
mod layout;
mod prune;
mod quantize;
mod sizing;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use semver::Version;
use tracing::{info, info_span};

use crate::atlas::{
    AtlasConfig, GateDecision, GraphCache, LayoutConfig, RawGraph, RepresentativeTable,
    VersionMarker, evaluate, marker_path, read_marker, write_marker,
};
use crate::error::AtlasError;
use anchor::locate_communities;
use clusters::{collect_clusters, place_clusters};
use export::{Artifact, ArtifactAttributes, artifact_path, write_artifact};
use graph::{aggregate_edges, load_nodes};
use layout::simulate;
use prune::prune_edges;
use quantize::quantize;
use sizing::apply_sizing;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Generated { nodes: usize, edges: usize },
    Skipped,
}

pub fn generate(
    name: &str,
    raw: &RawGraph,
    layout: &LayoutConfig,
    representatives: &RepresentativeTable,
    config_version: &Version,
) -> Result<Artifact> {
    let mut loaded = load_nodes(&raw.nodes, &layout.excluded_communities);
    if loaded.graph.node_count() == 0 {
        return Err(AtlasError::EmptyGraph(name.to_string()).into());
    }
    let totals = aggregate_edges(&mut loaded.graph, &loaded.index, &raw.edges);

    let anchors = layout
        .anchor_enabled
        .then(|| locate_communities(&loaded.graph, representatives, layout));

    apply_sizing(&mut loaded.graph, layout);
    simulate(&mut loaded.graph, layout, anchors.as_ref());

    let mut clusters = collect_clusters(&loaded.graph, representatives);
    place_clusters(&loaded.graph, &mut clusters);

    prune_edges(&mut loaded.graph, layout);
    quantize(&mut loaded.graph);

    let attributes = ArtifactAttributes {
        layout: name.to_string(),
        config_version: config_version.to_string(),
        graph_version: raw.graph_version,
        timestamp: raw.timestamp.clone(),
        hidden_nodes: loaded.hidden.len(),
        total_weight: totals.total_weight,
        clusters: IndexMap::new(),
    };
    Ok(Artifact::from_graph(&loaded.graph, &clusters, attributes))
}

pub fn run_layout(
    name: &str,
    config: &AtlasConfig,
    cache: &mut GraphCache,
    output_dir: &Path,
    force: bool,
) -> Result<Outcome> {
    let _span = info_span!("layout", name).entered();

    let layout = config.layout(name)?;
    layout.validate(name)?;
    let config_version = config.config_version()?;
    let raw = cache.get(&layout.input)?;

    let marker_file = marker_path(output_dir, name);
    let marker = VersionMarker {
        config_version: config_version.to_string(),
        graph_version: raw.graph_version.unwrap_or_default(),
    };

    if !force {
        match evaluate(read_marker(&marker_file).as_ref(), &config_version, raw.graph_version) {
            GateDecision::Skip { rewrite_marker } => {
                if rewrite_marker {
                    write_marker(&marker_file, &marker)?;
                }
                info!(rewrite_marker, "artifact is current; skipping");
                return Ok(Outcome::Skipped);
            }
            GateDecision::Regenerate(reason) => info!(reason, "regenerating"),
        }
    }

    let artifact = generate(
        name,
        &raw,
        layout,
        &config.representatives,
        &config_version,
    )?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    write_artifact(&artifact_path(output_dir, name), &artifact)?;
    write_marker(&marker_file, &marker)?;

    info!(
        nodes = artifact.nodes.len(),
        edges = artifact.edges.len(),
        clusters = artifact.attributes.clusters.len(),
        "wrote artifact"
    );
    Ok(Outcome::Generated {
        nodes: artifact.nodes.len(),
        edges: artifact.edges.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::atlas::{RawEdge, RawNode, Representative, parse_raw_graph};

    fn raw_node(id: &str, community: i64) -> RawNode {
        RawNode {
            id: id.to_string(),
            label: id.to_string(),
            community,
            weight: None,
        }
    }

    fn raw_edge(source: &str, target: &str, weight: f64) -> RawEdge {
        RawEdge {
            source: source.to_string(),
            target: target.to_string(),
            weight,
        }
    }

    fn five_node_graph() -> RawGraph {
        RawGraph {
            graph_version: Some(1),
            nodes: vec![
                raw_node("a", 1),
                raw_node("b", 1),
                raw_node("c", 1),
                raw_node("d", 2),
                raw_node("e", 2),
            ],
            edges: vec![
                raw_edge("a", "b", 10.0),
                raw_edge("a", "c", 5.0),
                raw_edge("a", "d", 1.0),
                raw_edge("d", "e", 8.0),
            ],
            ..RawGraph::default()
        }
    }

    #[test]
    fn five_node_pipeline_keeps_heaviest_edges_and_counts_clusters() {
        let layout = LayoutConfig {
            iteration_count: 50,
            non_removable_edge_count: 1,
            default_outbound_edge_cap: 2,
            ..LayoutConfig::default()
        };

        let artifact = generate(
            "main",
            &five_node_graph(),
            &layout,
            &RepresentativeTable::default(),
            &Version::new(1, 0, 0),
        )
        .expect("artifact");

        for node in &artifact.nodes {
            assert!(artifact
                .edges
                .iter()
                .any(|edge| edge.source == node.key || edge.target == node.key));
        }
        let from_a = artifact.edges.iter().filter(|edge| edge.source == "a").count();
        assert!(from_a <= 2);
        assert!(!artifact
            .edges
            .iter()
            .any(|edge| edge.source == "a" && edge.target == "d"));
        // d's heaviest incident edge is d -> e; a -> d is its second.
        assert_eq!(artifact.edges.len(), 3);

        let clusters = &artifact.attributes.clusters;
        assert_eq!(clusters[&1].size, 3);
        assert_eq!(clusters[&2].size, 2);
        assert!(clusters.values().all(|cluster| cluster.x.is_some()));
        for node in &artifact.nodes {
            assert!(node.size >= layout.min_size && node.size <= layout.max_size);
        }
    }

    #[test]
    fn excluded_communities_vanish_with_their_edges() {
        let layout = LayoutConfig {
            iteration_count: 10,
            excluded_communities: HashSet::from([2]),
            ..LayoutConfig::default()
        };

        let artifact = generate(
            "main",
            &five_node_graph(),
            &layout,
            &RepresentativeTable::default(),
            &Version::new(1, 0, 0),
        )
        .expect("artifact");

        assert_eq!(artifact.nodes.len(), 3);
        assert_eq!(artifact.edges.len(), 2);
        assert_eq!(artifact.attributes.hidden_nodes, 2);
        assert_eq!(artifact.attributes.total_weight, 15.0);
    }

    #[test]
    fn anchored_layout_names_clusters() {
        let layout = LayoutConfig {
            iteration_count: 30,
            anchor_enabled: true,
            anchor_pins: HashMap::from([("Core".to_string(), [0.0, 0.0])]),
            ..LayoutConfig::default()
        };
        let representatives = RepresentativeTable::from_iter([(
            "a".to_string(),
            Representative {
                assigned_cluster_label: "Core".to_string(),
                priority: 3,
                display_name: Some("The core".to_string()),
            },
        )]);

        let artifact = generate(
            "main",
            &five_node_graph(),
            &layout,
            &representatives,
            &Version::new(1, 0, 0),
        )
        .expect("artifact");

        let core = &artifact.attributes.clusters[&1];
        assert_eq!(core.label, "Core");
        assert_eq!(core.display_name, "The core");
        assert_eq!(artifact.attributes.clusters[&2].label, "");
    }

    #[test]
    fn fully_excluded_graph_is_an_error() {
        let layout = LayoutConfig {
            excluded_communities: HashSet::from([1, 2]),
            ..LayoutConfig::default()
        };
        let error = generate(
            "empty",
            &five_node_graph(),
            &layout,
            &RepresentativeTable::default(),
            &Version::new(1, 0, 0),
        )
        .expect_err("empty graph");
        assert!(matches!(
            error.downcast_ref::<AtlasError>(),
            Some(AtlasError::EmptyGraph(_))
        ));
    }

    const CONFIG: &str = r#"{
        "version": "1.4.0",
        "layouts": {
            "main": {"input": "graph.json", "iterationCount": 20},
            "side": {"input": "graph.json", "iterationCount": 20, "excludedCommunities": [2]}
        }
    }"#;

    const GRAPH: &str = r#"{
        "graphVersion": 12,
        "nodes": [
            {"id": "a", "handle": "a.test", "communityId": 1},
            {"id": "b", "handle": "b.test", "communityId": 1},
            {"id": "c", "handle": "c.test", "communityId": 2}
        ],
        "edges": [
            {"source": "a", "target": "b", "weight": 3},
            {"source": "b", "target": "a", "weight": 2},
            {"source": "b", "target": "c", "weight": 1}
        ]
    }"#;

    #[test]
    fn second_run_is_skipped_and_leaves_artifact_untouched() {
        let input = tempfile::tempdir().expect("input dir");
        let output = tempfile::tempdir().expect("output dir");
        fs::write(input.path().join("graph.json"), GRAPH).expect("graph");
        let config = AtlasConfig::parse(CONFIG).expect("config");
        let mut cache = GraphCache::new(input.path());

        let first = run_layout("main", &config, &mut cache, output.path(), false).expect("first");
        assert!(matches!(first, Outcome::Generated { nodes: 3, .. }));
        let artifact = fs::read(artifact_path(output.path(), "main")).expect("artifact");

        let second = run_layout("main", &config, &mut cache, output.path(), false).expect("second");
        assert_eq!(second, Outcome::Skipped);
        assert_eq!(
            fs::read(artifact_path(output.path(), "main")).expect("artifact"),
            artifact
        );

        let marker = read_marker(&marker_path(output.path(), "main")).expect("marker");
        assert_eq!(marker.graph_version, 12);
        assert_eq!(marker.config_version, "1.4.0");
    }

    #[test]
    fn patch_bump_rewrites_marker_only_and_force_regenerates() {
        let input = tempfile::tempdir().expect("input dir");
        let output = tempfile::tempdir().expect("output dir");
        fs::write(input.path().join("graph.json"), GRAPH).expect("graph");
        let mut cache = GraphCache::new(input.path());

        let config = AtlasConfig::parse(CONFIG).expect("config");
        run_layout("side", &config, &mut cache, output.path(), false).expect("first");

        let patched = AtlasConfig::parse(&CONFIG.replace("1.4.0", "1.4.3")).expect("patched");
        let outcome = run_layout("side", &patched, &mut cache, output.path(), false).expect("patch");
        assert_eq!(outcome, Outcome::Skipped);
        let marker = read_marker(&marker_path(output.path(), "side")).expect("marker");
        assert_eq!(marker.config_version, "1.4.3");

        let forced = run_layout("side", &patched, &mut cache, output.path(), true).expect("forced");
        assert_eq!(forced, Outcome::Generated { nodes: 2, edges: 2 });
    }

    #[test]
    fn unknown_layout_fails_only_that_run() {
        let output = tempfile::tempdir().expect("output dir");
        let config = AtlasConfig::parse(CONFIG).expect("config");
        let mut cache = GraphCache::new(output.path());

        let error = run_layout("missing", &config, &mut cache, output.path(), false)
            .expect_err("unknown layout");
        assert!(matches!(
            error.downcast_ref::<AtlasError>(),
            Some(AtlasError::UnknownLayout(_))
        ));
    }

    #[test]
    fn parsed_graph_feeds_generate() {
        let raw = parse_raw_graph(GRAPH).expect("graph");
        let layout = LayoutConfig {
            iteration_count: 5,
            ..LayoutConfig::default()
        };
        let artifact = generate(
            "main",
            &raw,
            &layout,
            &RepresentativeTable::default(),
            &Version::new(0, 1, 0),
        )
        .expect("artifact");
        assert_eq!(artifact.nodes[0].label, "a.test");
        assert_eq!(artifact.attributes.graph_version, Some(12));
    }
}
