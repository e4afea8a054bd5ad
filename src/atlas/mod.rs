mod cache;
mod config;
mod raw;
mod version;

pub use cache::GraphCache;
pub use config::{AtlasConfig, LayoutConfig, Representative, RepresentativeTable, SizingMode};
pub use raw::{RawEdge, RawGraph, RawNode, parse_raw_graph};
pub use version::{GateDecision, VersionMarker, evaluate, marker_path, read_marker, write_marker};
