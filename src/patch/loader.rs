//! Parses patch text into a validated graph plus its processor arena.
//!
//! Parsing never touches engine state. The loader builds everything into
//! local storage, runs full structural validation and scheduling, and only
//! then hands the result back, so a failed load leaves nothing behind.

use std::collections::BTreeMap;

use tracing::warn;

use crate::dsp::parameter::ParamValue;
use crate::dsp::processor::NodeProcessor;
use crate::dsp::registry::NodeRegistry;
use crate::graph::validation::{validate, NodeSignature, SignatureTable};
use crate::graph::{Graph, Node, NodeId, OutputRef, Schedule, StructuralError};

use super::{LoadError, ParseError};

/// The result of a successful parse: a validated graph, one constructed
/// processor per node, and the evaluation order.
pub struct LoadedPatch {
    pub graph: Graph,
    pub processors: BTreeMap<NodeId, Box<dyn NodeProcessor>>,
    pub schedule: Schedule,
}

struct PendingNode {
    id: NodeId,
    node: Node,
    processor: Box<dyn NodeProcessor>,
}

fn flush(
    current: &mut Option<PendingNode>,
    graph: &mut Graph,
    processors: &mut BTreeMap<NodeId, Box<dyn NodeProcessor>>,
) -> Result<(), StructuralError> {
    if let Some(pending) = current.take() {
        let mut node = pending.node;
        // Trailing undeclared ports are unconnected.
        let declared_inputs = pending.processor.inputs().len();
        while node.inputs.len() < declared_inputs {
            node.inputs.push(Vec::new());
        }
        graph.insert(pending.id, node)?;
        processors.insert(pending.id, pending.processor);
    }
    Ok(())
}

/// Parses and validates a complete patch.
pub fn parse_patch(text: &str, registry: &NodeRegistry) -> Result<LoadedPatch, LoadError> {
    let mut graph = Graph::new();
    let mut processors: BTreeMap<NodeId, Box<dyn NodeProcessor>> = BTreeMap::new();
    let mut current: Option<PendingNode> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let (directive, rest) = match line.split_once(char::is_whitespace) {
            Some((directive, rest)) => (directive, rest.trim()),
            None => (line, ""),
        };

        match directive {
            "node" => {
                flush(&mut current, &mut graph, &mut processors)?;

                let mut parts = rest.split_whitespace();
                let (id_text, type_id) = match (parts.next(), parts.next(), parts.next()) {
                    (Some(id_text), Some(type_id), None) => (id_text, type_id),
                    _ => {
                        return Err(ParseError::MalformedNodeLine {
                            line: line_no,
                            text: line.to_string(),
                        }
                        .into())
                    }
                };
                let id: NodeId = id_text.parse().map_err(|_| ParseError::InvalidNodeId {
                    line: line_no,
                    text: id_text.to_string(),
                })?;
                if graph.contains(id) {
                    return Err(StructuralError::DuplicateNodeId(id).into());
                }
                let Some(processor) = registry.construct(type_id) else {
                    return Err(StructuralError::UnknownType(type_id.to_string()).into());
                };

                current = Some(PendingNode {
                    id,
                    node: Node::new(type_id),
                    processor,
                });
            }

            "param" => {
                let Some(pending) = current.as_mut() else {
                    return Err(ParseError::DirectiveOutsideNode {
                        line: line_no,
                        directive: directive.to_string(),
                    }
                    .into());
                };
                let Some((name, literal)) = rest.split_once(':') else {
                    return Err(ParseError::MalformedParam {
                        line: line_no,
                        text: line.to_string(),
                    }
                    .into());
                };
                let name = name.trim();

                let declared = pending
                    .processor
                    .parameters()
                    .iter()
                    .position(|p| p.id == name)
                    .map(|i| (i, pending.processor.parameters()[i].kind));

                match declared {
                    Some((param_index, kind)) => {
                        let Some(value) = ParamValue::parse_as(kind, literal) else {
                            return Err(ParseError::BadLiteral {
                                line: line_no,
                                name: name.to_string(),
                                kind,
                                text: literal.to_string(),
                            }
                            .into());
                        };
                        pending.processor.set_parameter(param_index, &value);
                        pending.node.set_param(name, value);
                    }
                    None => {
                        // Kept in the graph so round-trips are lossless,
                        // but never applied to the processor.
                        warn!(
                            node = pending.id,
                            name, "parameter not declared by node type"
                        );
                        pending.node.set_param(name, ParamValue::infer(literal));
                    }
                }
            }

            "in" => {
                let Some(pending) = current.as_mut() else {
                    return Err(ParseError::DirectiveOutsideNode {
                        line: line_no,
                        directive: directive.to_string(),
                    }
                    .into());
                };

                let mut sources = Vec::new();
                for token in rest.split_whitespace() {
                    let parsed = token.split_once('.').and_then(|(node_text, output_text)| {
                        let node = node_text.parse::<NodeId>().ok()?;
                        let output = output_text.parse::<usize>().ok()?;
                        Some(OutputRef::new(node, output))
                    });
                    let Some(source) = parsed else {
                        return Err(ParseError::MalformedInputRef {
                            line: line_no,
                            text: token.to_string(),
                        }
                        .into());
                    };
                    sources.push(source);
                }
                pending.node.inputs.push(sources);

                let available = pending.processor.inputs().len();
                if pending.node.inputs.len() > available {
                    return Err(StructuralError::TooManyInputs {
                        node: pending.id,
                        type_id: pending.node.type_id.clone(),
                        declared: pending.node.inputs.len(),
                        available,
                    }
                    .into());
                }
            }

            other => {
                return Err(ParseError::UnknownDirective {
                    line: line_no,
                    directive: other.to_string(),
                }
                .into())
            }
        }
    }

    flush(&mut current, &mut graph, &mut processors)?;

    let signatures: SignatureTable = processors
        .iter()
        .map(|(&id, processor)| (id, NodeSignature::of(processor.as_ref())))
        .collect();
    validate(&graph, &signatures)?;
    let schedule = Schedule::compute(&graph)?;

    Ok(LoadedPatch {
        graph,
        processors,
        schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{SINK_ID, SINK_TYPE};
    use crate::modules;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        modules::register_builtins(&mut registry);
        registry
    }

    #[test]
    fn test_minimal_patch() {
        let patch = "node 0 sink\n";
        let loaded = parse_patch(patch, &registry()).unwrap();
        assert_eq!(loaded.graph.len(), 1);
        assert_eq!(loaded.graph.get(SINK_ID).unwrap().type_id, SINK_TYPE);
        // Undeclared input ports are padded to the type's shape.
        assert_eq!(loaded.graph.get(SINK_ID).unwrap().inputs.len(), 2);
        assert_eq!(loaded.schedule.order(), &[SINK_ID]);
    }

    #[test]
    fn test_comments_and_blank_lines_are_ignored() {
        let patch = "\n; a patch\n\nnode 0 sink\n  ; indented comment\nin 1.0\nin\n\nnode 1 osc.sine\nparam freq:880\n";
        let loaded = parse_patch(patch, &registry()).unwrap();
        assert_eq!(loaded.graph.len(), 2);
        assert_eq!(
            loaded.graph.get(0).unwrap().inputs[0],
            vec![OutputRef::new(1, 0)]
        );
        assert!(loaded.graph.get(0).unwrap().inputs[1].is_empty());
    }

    #[test]
    fn test_fan_in_on_one_line() {
        let patch = "node 0 sink\nin 1.0 2.0\n\nnode 1 osc.sine\nnode 2 osc.sine\n";
        let loaded = parse_patch(patch, &registry()).unwrap();
        assert_eq!(
            loaded.graph.get(0).unwrap().inputs[0],
            vec![OutputRef::new(1, 0), OutputRef::new(2, 0)]
        );
    }

    #[test]
    fn test_typed_parameter_parsing() {
        let patch = "node 0 sink\nnode 1 osc.sine\nparam freq:880\n";
        let loaded = parse_patch(patch, &registry()).unwrap();
        assert_eq!(
            loaded.graph.get(1).unwrap().param("freq"),
            Some(&ParamValue::Float(880.0))
        );
    }

    #[test]
    fn test_unknown_parameter_is_kept() {
        let patch = "node 0 sink\nnode 1 osc.sine\nparam wobble:3\n";
        let loaded = parse_patch(patch, &registry()).unwrap();
        assert_eq!(
            loaded.graph.get(1).unwrap().param("wobble"),
            Some(&ParamValue::Int(3))
        );
    }

    #[test]
    fn test_bad_literal_is_a_parse_error() {
        let patch = "node 0 sink\nnode 1 osc.sine\nparam freq:abc\n";
        assert!(matches!(
            parse_patch(patch, &registry()),
            Err(LoadError::Parse(ParseError::BadLiteral { line: 3, .. }))
        ));
    }

    #[test]
    fn test_duplicate_node_id() {
        let patch = "node 0 sink\nnode 1 osc.sine\nnode 1 osc.sine\n";
        assert_eq!(
            parse_patch(patch, &registry()).err(),
            Some(LoadError::Structural(StructuralError::DuplicateNodeId(1)))
        );
    }

    #[test]
    fn test_unknown_type() {
        let patch = "node 0 sink\nnode 1 osc.triangle\n";
        assert_eq!(
            parse_patch(patch, &registry()).err(),
            Some(LoadError::Structural(StructuralError::UnknownType(
                "osc.triangle".to_string()
            )))
        );
    }

    #[test]
    fn test_directive_before_node() {
        let patch = "param freq:880\n";
        assert!(matches!(
            parse_patch(patch, &registry()),
            Err(LoadError::Parse(ParseError::DirectiveOutsideNode {
                line: 1,
                ..
            }))
        ));
    }

    #[test]
    fn test_unknown_directive() {
        let patch = "node 0 sink\nfrobnicate 1 2\n";
        assert!(matches!(
            parse_patch(patch, &registry()),
            Err(LoadError::Parse(ParseError::UnknownDirective { line: 2, .. }))
        ));
    }

    #[test]
    fn test_malformed_input_ref() {
        let patch = "node 0 sink\nin 1:0\n";
        assert!(matches!(
            parse_patch(patch, &registry()),
            Err(LoadError::Parse(ParseError::MalformedInputRef {
                line: 2,
                ..
            }))
        ));
    }

    #[test]
    fn test_too_many_input_lines() {
        let patch = "node 0 sink\nin\nin\nin\n";
        assert!(matches!(
            parse_patch(patch, &registry()),
            Err(LoadError::Structural(StructuralError::TooManyInputs {
                node: 0,
                ..
            }))
        ));
    }

    #[test]
    fn test_missing_sink_is_rejected() {
        let patch = "node 1 osc.sine\n";
        assert_eq!(
            parse_patch(patch, &registry()).err(),
            Some(LoadError::Structural(StructuralError::MissingSink))
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let patch = "node 0 sink\nin 1.0\n\nnode 1 fx.gain\nin 2.0\n\nnode 2 fx.gain\nin 1.0\n";
        assert!(matches!(
            parse_patch(patch, &registry()),
            Err(LoadError::Structural(StructuralError::Cycle(_)))
        ));
    }
}
