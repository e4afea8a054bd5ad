use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::{RawGraph, parse_raw_graph};

pub struct GraphCache {
    input_dir: PathBuf,
    graphs: HashMap<String, Arc<RawGraph>>,
}

impl GraphCache {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            graphs: HashMap::new(),
        }
    }

    pub fn get(&mut self, file_name: &str) -> Result<Arc<RawGraph>> {
        if let Some(graph) = self.graphs.get(file_name) {
            return Ok(Arc::clone(graph));
        }

        let path = self.input_dir.join(file_name);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read graph input {}", path.display()))?;
        let graph = Arc::new(
            parse_raw_graph(&raw)
                .with_context(|| format!("failed to parse graph input {}", path.display()))?,
        );
        info!(
            file = file_name,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            graph_version = ?graph.graph_version,
            "loaded graph input"
        );

        self.graphs.insert(file_name.to_string(), Arc::clone(&graph));
        Ok(graph)
    }
}
