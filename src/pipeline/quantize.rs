use super::graph::WorkingGraph;
use crate::physics::vec2;
use crate::util::round_to;

const COORDINATE_DECIMALS: i32 = 2;
const SIZE_DECIMALS: i32 = 2;

pub fn quantize(graph: &mut WorkingGraph) {
    for node in &mut graph.nodes {
        node.position = vec2(
            round_to(node.position.x, COORDINATE_DECIMALS),
            round_to(node.position.y, COORDINATE_DECIMALS),
        );
        node.size = round_to(node.size, SIZE_DECIMALS);
        node.area = round_to(node.area, SIZE_DECIMALS);
    }
}
