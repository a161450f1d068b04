//! Evaluation order computation.
//!
//! The schedule is a depth-first walk backward from the sink: a node's
//! dependencies appear before the node itself, and each reachable node
//! appears exactly once. Nodes not reachable from the sink are left out
//! entirely, so they stay inert until reconnected. Finding a node already
//! on the walk's stack means the graph has a cycle.

use std::collections::HashMap;

use super::{Graph, NodeId, StructuralError, SINK_ID};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    /// On the DFS stack; seeing it again means a cycle.
    InProgress,
    /// Fully visited and emitted into the order.
    Done,
}

struct Frame {
    node: NodeId,
    deps: Vec<NodeId>,
    next: usize,
}

impl Frame {
    fn new(node: NodeId, graph: &Graph) -> Self {
        let deps = graph
            .get(node)
            .map(|n| {
                n.inputs
                    .iter()
                    .flat_map(|sources| sources.iter().map(|s| s.node))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            node,
            deps,
            next: 0,
        }
    }
}

/// A cached evaluation order rooted at the sink.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schedule {
    order: Vec<NodeId>,
}

impl Schedule {
    /// Computes the evaluation order for a graph.
    ///
    /// The walk visits input ports in declaration order and fan-in sources
    /// in connection order, so the result is deterministic for a given
    /// graph. Returns [`StructuralError::Cycle`] naming a node on the cycle
    /// if one is reachable from the sink.
    pub fn compute(graph: &Graph) -> Result<Self, StructuralError> {
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(graph.len());

        if !graph.contains(SINK_ID) {
            return Ok(Self { order });
        }

        let mut stack = vec![Frame::new(SINK_ID, graph)];
        marks.insert(SINK_ID, Mark::InProgress);

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.deps.len() {
                let dep = frame.deps[frame.next];
                frame.next += 1;

                match marks.get(&dep) {
                    Some(Mark::InProgress) => return Err(StructuralError::Cycle(dep)),
                    Some(Mark::Done) => {}
                    None => {
                        // Dangling references are a validation error; skip
                        // them here so the two checks stay independent.
                        if graph.contains(dep) {
                            marks.insert(dep, Mark::InProgress);
                            stack.push(Frame::new(dep, graph));
                        }
                    }
                }
            } else {
                marks.insert(frame.node, Mark::Done);
                order.push(frame.node);
                stack.pop();
            }
        }

        Ok(Self { order })
    }

    /// The evaluation order, dependencies first, sink last.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns true if the node is reachable from the sink.
    pub fn is_scheduled(&self, node: NodeId) -> bool {
        self.order.contains(&node)
    }

    /// Position of a node in the order, if scheduled.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == node)
    }

    /// Number of scheduled nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, OutputRef, SINK_TYPE};

    fn node(type_id: &str, input_ports: usize) -> Node {
        let mut node = Node::new(type_id);
        node.inputs = vec![Vec::new(); input_ports];
        node
    }

    fn chain() -> Graph {
        // 2 -> 1 -> sink
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 1)).unwrap();
        graph.insert(1, node("fx.gain", 1)).unwrap();
        graph.insert(2, node("osc.sine", 0)).unwrap();
        graph.connect(OutputRef::new(1, 0), 0, 0);
        graph.connect(OutputRef::new(2, 0), 1, 0);
        graph
    }

    #[test]
    fn test_dependencies_come_first() {
        let schedule = Schedule::compute(&chain()).unwrap();
        assert_eq!(schedule.order(), &[2, 1, 0]);
    }

    #[test]
    fn test_diamond_is_evaluated_once() {
        // 3 feeds both 1 and 2, which both feed the sink.
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 2)).unwrap();
        graph.insert(1, node("fx.gain", 1)).unwrap();
        graph.insert(2, node("fx.gain", 1)).unwrap();
        graph.insert(3, node("osc.sine", 0)).unwrap();
        graph.connect(OutputRef::new(1, 0), 0, 0);
        graph.connect(OutputRef::new(2, 0), 0, 1);
        graph.connect(OutputRef::new(3, 0), 1, 0);
        graph.connect(OutputRef::new(3, 0), 2, 0);

        let schedule = Schedule::compute(&graph).unwrap();
        assert_eq!(schedule.len(), 4);
        assert_eq!(
            schedule.order().iter().filter(|&&n| n == 3).count(),
            1
        );
        assert!(schedule.position(3).unwrap() < schedule.position(1).unwrap());
        assert!(schedule.position(3).unwrap() < schedule.position(2).unwrap());
        assert_eq!(schedule.position(0), Some(3));
    }

    #[test]
    fn test_unreachable_nodes_are_unscheduled() {
        let mut graph = chain();
        graph.insert(9, node("osc.sine", 0)).unwrap();

        let schedule = Schedule::compute(&graph).unwrap();
        assert!(!schedule.is_scheduled(9));
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 1)).unwrap();
        graph.insert(1, node("fx.gain", 1)).unwrap();
        graph.insert(2, node("fx.gain", 1)).unwrap();
        graph.connect(OutputRef::new(1, 0), 0, 0);
        graph.connect(OutputRef::new(2, 0), 1, 0);
        graph.connect(OutputRef::new(1, 0), 2, 0);

        assert!(matches!(
            Schedule::compute(&graph),
            Err(StructuralError::Cycle(_))
        ));
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 1)).unwrap();
        graph.insert(1, node("fx.gain", 1)).unwrap();
        graph.connect(OutputRef::new(1, 0), 0, 0);
        graph.connect(OutputRef::new(1, 0), 1, 0);

        assert_eq!(
            Schedule::compute(&graph),
            Err(StructuralError::Cycle(1))
        );
    }

    #[test]
    fn test_cycle_off_the_sink_path_is_ignored() {
        // 3 and 4 form a cycle, but neither reaches the sink.
        let mut graph = chain();
        graph.insert(3, node("fx.gain", 1)).unwrap();
        graph.insert(4, node("fx.gain", 1)).unwrap();
        graph.connect(OutputRef::new(4, 0), 3, 0);
        graph.connect(OutputRef::new(3, 0), 4, 0);

        let schedule = Schedule::compute(&graph).unwrap();
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn test_empty_graph_schedules_nothing() {
        let schedule = Schedule::compute(&Graph::new()).unwrap();
        assert!(schedule.is_empty());
    }
}
