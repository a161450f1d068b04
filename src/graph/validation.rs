//! Structural validation of a graph against its node types' port shapes.
//!
//! Validation runs on every load and before every accepted mutation. It
//! needs to know each node's port kinds, which live on the processors, so
//! callers pass a signature table built from the constructed instances.

use std::collections::BTreeMap;

use crate::dsp::processor::NodeProcessor;
use crate::dsp::signal::SignalKind;

use super::{Graph, NodeId, StructuralError, SINK_ID, SINK_TYPE};

/// The port shape of one node, extracted from its processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSignature {
    pub inputs: Vec<SignalKind>,
    pub outputs: Vec<SignalKind>,
}

impl NodeSignature {
    /// Extracts the signature from a processor instance.
    pub fn of(processor: &dyn NodeProcessor) -> Self {
        Self {
            inputs: processor.inputs().iter().map(|p| p.kind).collect(),
            outputs: processor.outputs().iter().map(|p| p.kind).collect(),
        }
    }
}

/// Port shapes for every node in a graph, keyed by node id.
pub type SignatureTable = BTreeMap<NodeId, NodeSignature>;

/// Checks every structural invariant except acyclicity (the scheduler
/// owns that one).
///
/// Verified here: the sink exists at id 0 and is unique, declared input
/// ports fit the node type, and every connection references an existing
/// node, an in-range output, and a matching signal kind.
pub fn validate(graph: &Graph, signatures: &SignatureTable) -> Result<(), StructuralError> {
    match graph.get(SINK_ID) {
        Some(node) if node.type_id == SINK_TYPE => {}
        _ => return Err(StructuralError::MissingSink),
    }
    for (id, node) in graph.iter() {
        if id != SINK_ID && node.type_id == SINK_TYPE {
            return Err(StructuralError::DuplicateSink(id));
        }
    }

    for (id, node) in graph.iter() {
        let Some(signature) = signatures.get(&id) else {
            return Err(StructuralError::UnknownType(node.type_id.clone()));
        };

        if node.inputs.len() > signature.inputs.len() {
            return Err(StructuralError::TooManyInputs {
                node: id,
                type_id: node.type_id.clone(),
                declared: node.inputs.len(),
                available: signature.inputs.len(),
            });
        }

        for (input, sources) in node.inputs.iter().enumerate() {
            let to_kind = signature.inputs[input];

            for source in sources {
                let Some(source_signature) = signatures.get(&source.node) else {
                    return Err(StructuralError::DanglingNode {
                        node: id,
                        input,
                        missing: source.node,
                    });
                };
                if !graph.contains(source.node) {
                    return Err(StructuralError::DanglingNode {
                        node: id,
                        input,
                        missing: source.node,
                    });
                }

                let Some(&from_kind) = source_signature.outputs.get(source.output) else {
                    return Err(StructuralError::OutputOutOfRange {
                        node: id,
                        source_node: source.node,
                        output: source.output,
                        count: source_signature.outputs.len(),
                    });
                };

                if from_kind != to_kind {
                    return Err(StructuralError::KindMismatch {
                        from: source.node,
                        output: source.output,
                        to: id,
                        input,
                        from_kind,
                        to_kind,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, OutputRef};

    fn sig(inputs: &[SignalKind], outputs: &[SignalKind]) -> NodeSignature {
        NodeSignature {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }

    fn node(type_id: &str, input_ports: usize) -> Node {
        let mut node = Node::new(type_id);
        node.inputs = vec![Vec::new(); input_ports];
        node
    }

    fn sink_and_osc() -> (Graph, SignatureTable) {
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 2)).unwrap();
        graph.insert(1, node("osc.sine", 0)).unwrap();

        let mut signatures = SignatureTable::new();
        signatures.insert(0, sig(&[SignalKind::Audio, SignalKind::Audio], &[]));
        signatures.insert(1, sig(&[], &[SignalKind::Audio]));
        (graph, signatures)
    }

    #[test]
    fn test_valid_graph_passes() {
        let (mut graph, signatures) = sink_and_osc();
        graph.connect(OutputRef::new(1, 0), 0, 0);
        assert_eq!(validate(&graph, &signatures), Ok(()));
    }

    #[test]
    fn test_missing_sink() {
        let mut graph = Graph::new();
        graph.insert(1, node("osc.sine", 0)).unwrap();
        let mut signatures = SignatureTable::new();
        signatures.insert(1, sig(&[], &[SignalKind::Audio]));

        assert_eq!(
            validate(&graph, &signatures),
            Err(StructuralError::MissingSink)
        );
    }

    #[test]
    fn test_sink_must_have_sink_type() {
        let mut graph = Graph::new();
        graph.insert(0, node("osc.sine", 0)).unwrap();
        let mut signatures = SignatureTable::new();
        signatures.insert(0, sig(&[], &[SignalKind::Audio]));

        assert_eq!(
            validate(&graph, &signatures),
            Err(StructuralError::MissingSink)
        );
    }

    #[test]
    fn test_duplicate_sink() {
        let (mut graph, mut signatures) = sink_and_osc();
        graph.insert(2, node(SINK_TYPE, 2)).unwrap();
        signatures.insert(2, sig(&[SignalKind::Audio, SignalKind::Audio], &[]));

        assert_eq!(
            validate(&graph, &signatures),
            Err(StructuralError::DuplicateSink(2))
        );
    }

    #[test]
    fn test_dangling_reference() {
        let (mut graph, signatures) = sink_and_osc();
        graph.connect(OutputRef::new(7, 0), 0, 0);

        assert_eq!(
            validate(&graph, &signatures),
            Err(StructuralError::DanglingNode {
                node: 0,
                input: 0,
                missing: 7
            })
        );
    }

    #[test]
    fn test_output_out_of_range() {
        let (mut graph, signatures) = sink_and_osc();
        graph.connect(OutputRef::new(1, 3), 0, 0);

        assert_eq!(
            validate(&graph, &signatures),
            Err(StructuralError::OutputOutOfRange {
                node: 0,
                source_node: 1,
                output: 3,
                count: 1
            })
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let (mut graph, mut signatures) = sink_and_osc();
        graph.insert(2, node("util.value", 0)).unwrap();
        signatures.insert(2, sig(&[], &[SignalKind::Control]));
        graph.connect(OutputRef::new(2, 0), 0, 0);

        assert!(matches!(
            validate(&graph, &signatures),
            Err(StructuralError::KindMismatch {
                from: 2,
                to: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_too_many_inputs() {
        let (mut graph, signatures) = sink_and_osc();
        graph.get_mut(1).unwrap().inputs.push(Vec::new());

        assert_eq!(
            validate(&graph, &signatures),
            Err(StructuralError::TooManyInputs {
                node: 1,
                type_id: "osc.sine".to_string(),
                declared: 1,
                available: 0
            })
        );
    }
}
