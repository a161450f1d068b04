//! Serializes a graph back to patch text.
//!
//! The output parses back to a structurally equal graph: node order is
//! ascending by id, parameters keep their first-set order, and every input
//! port gets an `in` line (bare for unconnected ports) so port indices
//! survive the round trip.

use crate::graph::Graph;

/// Renders a graph as patch text.
pub fn serialize_graph(graph: &Graph) -> String {
    let mut out = String::new();

    for (id, node) in graph.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("node {} {}\n", id, node.type_id));

        for (name, value) in &node.params {
            out.push_str(&format!("param {}:{}\n", name, value));
        }

        for sources in &node.inputs {
            if sources.is_empty() {
                out.push_str("in\n");
            } else {
                out.push_str("in");
                for source in sources {
                    out.push_str(&format!(" {}", source));
                }
                out.push('\n');
            }
        }
    }

    out
}
