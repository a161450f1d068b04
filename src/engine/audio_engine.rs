//! The block-rendering execution engine.
//!
//! An [`Engine`] owns one graph, one processor per node, and two buffer
//! pools (node outputs and mixed inputs). `render` walks the cached
//! schedule order, mixes each node's fan-in, runs the processor, and hands
//! back the sink's mixed inputs as the stereo result. All mutation goes
//! through the engine so the graph, the processor arena, and the pools
//! never drift apart.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dsp::context::ProcessContext;
use crate::dsp::parameter::ParamValue;
use crate::dsp::processor::NodeProcessor;
use crate::dsp::registry::NodeRegistry;
use crate::dsp::signal::{SignalBuffer, SignalKind};
use crate::graph::{
    Graph, IdAllocator, Node, NodeId, OutputRef, Schedule, StructuralError, SINK_ID, SINK_TYPE,
};
use crate::modules;
use crate::patch::{parse_patch, serialize_graph, LoadError, LoadedPatch};

use super::buffer_pool::BufferPool;
use super::channels::CommandReceiver;
use super::commands::EngineCommand;

struct ProcessorSlot {
    processor: Box<dyn NodeProcessor>,
    /// Tick this node was last evaluated on. Acts as the per-tick memo:
    /// it advances, never clears, and is bounded by the node count.
    last_tick: u64,
    /// Non-finite output has been logged for this node already.
    warned_nonfinite: bool,
}

/// A single-threaded pull-based audio graph renderer.
///
/// Multiple engines are independent; each has its own registry, graph, and
/// id space, and may render on its own thread.
pub struct Engine {
    registry: NodeRegistry,
    graph: Graph,
    slots: BTreeMap<NodeId, ProcessorSlot>,
    schedule: Schedule,
    /// Mixed fan-in, one buffer per input port per node.
    input_pool: BufferPool,
    /// Rendered outputs, one buffer per output port per node.
    output_pool: BufferPool,
    ids: IdAllocator,
    sample_rate: f32,
    block_size: usize,
    tick: u64,
}

impl Engine {
    /// Creates an engine with the built-in node types and an empty graph
    /// containing only the sink at node 0.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        let mut registry = NodeRegistry::new();
        modules::register_builtins(&mut registry);
        Self::with_registry(registry, sample_rate, block_size)
    }

    /// Creates an engine with a caller-supplied registry. The registry must
    /// include a type with id [`SINK_TYPE`].
    pub fn with_registry(registry: NodeRegistry, sample_rate: f32, block_size: usize) -> Self {
        let mut engine = Self {
            registry,
            graph: Graph::new(),
            slots: BTreeMap::new(),
            schedule: Schedule::default(),
            input_pool: BufferPool::new(block_size),
            output_pool: BufferPool::new(block_size),
            ids: IdAllocator::new(),
            sample_rate,
            block_size,
            tick: 0,
        };

        let sink_id = engine.ids.next_id();
        match engine.registry.construct(SINK_TYPE) {
            Some(processor) => engine.install_node(sink_id, SINK_TYPE, processor),
            None => warn!("registry has no '{}' type; engine renders nothing", SINK_TYPE),
        }
        engine.rebuild_schedule();
        engine
    }

    /// Registers an additional node type.
    ///
    /// # Panics
    /// Panics if the type id collides with an existing registration.
    pub fn register_node_type<P: NodeProcessor + Default + 'static>(&mut self) {
        self.registry.register::<P>();
    }

    fn install_node(&mut self, id: NodeId, type_id: &str, mut processor: Box<dyn NodeProcessor>) {
        processor.prepare(self.sample_rate, self.block_size);

        let input_kinds: Vec<SignalKind> = processor.inputs().iter().map(|p| p.kind).collect();
        let output_kinds: Vec<SignalKind> = processor.outputs().iter().map(|p| p.kind).collect();
        self.input_pool.allocate_node(id, &input_kinds);
        self.output_pool.allocate_node(id, &output_kinds);

        let mut node = Node::new(type_id);
        node.inputs = vec![Vec::new(); input_kinds.len()];
        if self.graph.insert(id, node).is_ok() {
            self.slots.insert(
                id,
                ProcessorSlot {
                    processor,
                    last_tick: self.tick,
                    warned_nonfinite: false,
                },
            );
        }
    }

    fn rebuild_schedule(&mut self) {
        match Schedule::compute(&self.graph) {
            Ok(schedule) => {
                debug!(scheduled = schedule.len(), "schedule rebuilt");
                self.schedule = schedule;
            }
            Err(err) => warn!(%err, "schedule rebuild failed; keeping previous order"),
        }
    }

    /// Adds a node of a registered type and returns its id.
    ///
    /// The id comes from the engine's monotonic allocator; ids of removed
    /// nodes are never handed out again. A second sink is refused.
    pub fn add_node(&mut self, type_id: &str) -> Result<NodeId, StructuralError> {
        let Some(processor) = self.registry.construct(type_id) else {
            return Err(StructuralError::UnknownType(type_id.to_string()));
        };
        let id = self.ids.next_id();
        if type_id == SINK_TYPE {
            return Err(StructuralError::DuplicateSink(id));
        }

        self.install_node(id, type_id, processor);
        self.rebuild_schedule();
        debug!(id, type_id, "node added");
        Ok(id)
    }

    /// Removes a node, its processor state, and every touching connection.
    ///
    /// The sink cannot be removed. Returns false if the id does not exist.
    pub fn remove_node(&mut self, node_id: NodeId) -> bool {
        if node_id == SINK_ID {
            warn!("the sink cannot be removed");
            return false;
        }
        if self.graph.remove(node_id).is_none() {
            return false;
        }
        self.slots.remove(&node_id);
        self.input_pool.deallocate_node(node_id);
        self.output_pool.deallocate_node(node_id);
        self.rebuild_schedule();
        debug!(node_id, "node removed");
        true
    }

    /// Routes an output into an input port's fan-in list.
    ///
    /// Validates existence, port ranges, and signal kinds up front; the
    /// edge is then added tentatively and reverted if it closes a cycle.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_output: usize,
        to_node: NodeId,
        to_input: usize,
    ) -> Result<(), StructuralError> {
        let Some(from_slot) = self.slots.get(&from_node) else {
            return Err(StructuralError::DanglingNode {
                node: to_node,
                input: to_input,
                missing: from_node,
            });
        };
        let Some(to_slot) = self.slots.get(&to_node) else {
            return Err(StructuralError::DanglingNode {
                node: to_node,
                input: to_input,
                missing: to_node,
            });
        };

        let from_ports = from_slot.processor.outputs();
        let Some(from_port) = from_ports.get(from_output) else {
            return Err(StructuralError::OutputOutOfRange {
                node: to_node,
                source_node: from_node,
                output: from_output,
                count: from_ports.len(),
            });
        };
        let to_ports = to_slot.processor.inputs();
        let Some(to_port) = to_ports.get(to_input) else {
            return Err(StructuralError::InputOutOfRange {
                node: to_node,
                input: to_input,
                count: to_ports.len(),
            });
        };
        if from_port.kind != to_port.kind {
            return Err(StructuralError::KindMismatch {
                from: from_node,
                output: from_output,
                to: to_node,
                input: to_input,
                from_kind: from_port.kind,
                to_kind: to_port.kind,
            });
        }

        let source = OutputRef::new(from_node, from_output);
        if self.graph.is_connected(source, to_node, to_input) {
            return Err(StructuralError::DuplicateConnection {
                from: from_node,
                output: from_output,
                to: to_node,
                input: to_input,
            });
        }

        self.graph.connect(source, to_node, to_input);
        match Schedule::compute(&self.graph) {
            Ok(schedule) => {
                self.schedule = schedule;
                Ok(())
            }
            Err(err) => {
                self.graph.disconnect(source, to_node, to_input);
                Err(err)
            }
        }
    }

    /// Removes one edge. Returns false if it was not present.
    pub fn disconnect(
        &mut self,
        from_node: NodeId,
        from_output: usize,
        to_node: NodeId,
        to_input: usize,
    ) -> bool {
        let removed =
            self.graph
                .disconnect(OutputRef::new(from_node, from_output), to_node, to_input);
        if removed {
            self.rebuild_schedule();
        }
        removed
    }

    /// Sets a declared parameter by name, checking its kind.
    pub fn set_parameter(
        &mut self,
        node_id: NodeId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), StructuralError> {
        let Some(slot) = self.slots.get_mut(&node_id) else {
            return Err(StructuralError::UnknownParameter {
                node: node_id,
                name: name.to_string(),
            });
        };
        let Some(index) = slot.processor.parameters().iter().position(|p| p.id == name) else {
            return Err(StructuralError::UnknownParameter {
                node: node_id,
                name: name.to_string(),
            });
        };
        let expected = slot.processor.parameters()[index].kind;
        if value.kind() != expected {
            return Err(StructuralError::ParamKindMismatch {
                node: node_id,
                name: name.to_string(),
                expected,
                found: value.kind(),
            });
        }

        slot.processor.set_parameter(index, &value);
        if let Some(node) = self.graph.get_mut(node_id) {
            node.set_param(name, value);
        }
        Ok(())
    }

    /// Replaces the running graph with a parsed patch.
    ///
    /// Atomic: parsing, validation, and scheduling all happen on local
    /// state, so any error leaves the current graph untouched. On success
    /// the id allocator is bumped past the highest loaded id.
    pub fn load(&mut self, text: &str) -> Result<(), LoadError> {
        let LoadedPatch {
            graph,
            processors,
            schedule,
        } = parse_patch(text, &self.registry)?;

        self.slots.clear();
        self.input_pool.clear_pool();
        self.output_pool.clear_pool();

        for (id, mut processor) in processors {
            processor.prepare(self.sample_rate, self.block_size);
            let input_kinds: Vec<SignalKind> =
                processor.inputs().iter().map(|p| p.kind).collect();
            let output_kinds: Vec<SignalKind> =
                processor.outputs().iter().map(|p| p.kind).collect();
            self.input_pool.allocate_node(id, &input_kinds);
            self.output_pool.allocate_node(id, &output_kinds);
            self.slots.insert(
                id,
                ProcessorSlot {
                    processor,
                    last_tick: self.tick,
                    warned_nonfinite: false,
                },
            );
        }

        if let Some(max_id) = graph.max_id() {
            self.ids.bump_past(max_id);
        }
        info!(
            nodes = graph.len(),
            connections = graph.connections().count(),
            "patch loaded"
        );
        self.graph = graph;
        self.schedule = schedule;
        Ok(())
    }

    /// Serializes the running graph as patch text.
    pub fn serialize_patch(&self) -> String {
        serialize_graph(&self.graph)
    }

    /// Resets every processor's internal state without touching the graph.
    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            slot.processor.reset();
        }
    }

    /// Drains the command queue, applying each mutation in order.
    ///
    /// Call between renders; rejected commands are logged and dropped so
    /// one bad request cannot stall the queue. Returns the number of
    /// commands taken off the queue.
    pub fn apply_commands(&mut self, commands: &mut CommandReceiver) -> usize {
        let mut drained = 0;
        while let Some(command) = commands.recv() {
            drained += 1;
            match command {
                EngineCommand::AddNode { type_id } => {
                    if let Err(err) = self.add_node(&type_id) {
                        warn!(%err, "add node rejected");
                    }
                }
                EngineCommand::RemoveNode { node_id } => {
                    if !self.remove_node(node_id) {
                        warn!(node_id, "remove node rejected");
                    }
                }
                EngineCommand::Connect {
                    from_node,
                    from_output,
                    to_node,
                    to_input,
                } => {
                    if let Err(err) = self.connect(from_node, from_output, to_node, to_input) {
                        warn!(%err, "connect rejected");
                    }
                }
                EngineCommand::Disconnect {
                    from_node,
                    from_output,
                    to_node,
                    to_input,
                } => {
                    if !self.disconnect(from_node, from_output, to_node, to_input) {
                        warn!(from_node, to_node, "disconnect: no such edge");
                    }
                }
                EngineCommand::SetParameter {
                    node_id,
                    name,
                    value,
                } => {
                    if let Err(err) = self.set_parameter(node_id, &name, value) {
                        warn!(%err, "set parameter rejected");
                    }
                }
                EngineCommand::LoadPatch { text } => {
                    if let Err(err) = self.load(&text) {
                        warn!(%err, "patch rejected");
                    }
                }
                EngineCommand::ResetAll => self.reset(),
            }
        }
        drained
    }

    /// Renders one block and returns the sink's left and right inputs.
    ///
    /// Evaluation follows the cached schedule: every node reachable from
    /// the sink runs exactly once per tick, dependencies first. Non-finite
    /// samples are replaced with 0.0 at the producing node's boundary.
    pub fn render(&mut self) -> (&[f32], &[f32]) {
        self.tick += 1;
        let context = ProcessContext {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            tick: self.tick,
        };

        self.output_pool.clear_all();

        for index in 0..self.schedule.len() {
            let node_id = self.schedule.order()[index];
            let Some(node) = self.graph.get(node_id) else {
                continue;
            };
            let Some(slot) = self.slots.get_mut(&node_id) else {
                continue;
            };
            if slot.last_tick == self.tick {
                continue;
            }

            // Mix phase: fold every connected source into the node's
            // input scratch buffers.
            if let Some(scratch) = self.input_pool.node_buffers_mut(node_id) {
                for (port, sources) in node.inputs.iter().enumerate() {
                    let Some(buffer) = scratch.get_mut(port) else {
                        continue;
                    };
                    buffer.clear();
                    for source in sources {
                        if let Some(output) = self.output_pool.get(source.node, source.output) {
                            buffer.mix_from(output);
                        }
                    }
                    if let Some(events) = buffer.events_mut() {
                        events.sort_by_key(|e| e.timestamp);
                    }
                }
            }

            let inputs = self.input_pool.node_buffers(node_id).unwrap_or(&[]);
            let Some(outputs) = self.output_pool.node_buffers_mut(node_id) else {
                continue;
            };
            slot.processor.process(inputs, outputs, &context);
            slot.last_tick = self.tick;

            let mut contained = 0usize;
            for buffer in outputs.iter_mut() {
                if let Some(samples) = buffer.samples_mut() {
                    for sample in samples.iter_mut() {
                        if !sample.is_finite() {
                            *sample = 0.0;
                            contained += 1;
                        }
                    }
                }
            }
            if contained > 0 && !slot.warned_nonfinite {
                slot.warned_nonfinite = true;
                warn!(node_id, contained, "non-finite samples replaced with 0.0");
            }
        }

        let left = self
            .input_pool
            .get(SINK_ID, 0)
            .and_then(SignalBuffer::samples)
            .unwrap_or(&[]);
        let right = self
            .input_pool
            .get(SINK_ID, 1)
            .and_then(SignalBuffer::samples)
            .unwrap_or(&[]);
        (left, right)
    }

    /// The running graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The cached evaluation order.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The node type registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Samples per rendered block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks rendered so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::parameter::ParamKind;
    use crate::dsp::port::PortDefinition;
    use crate::dsp::processor::NodeInfo;

    fn engine() -> Engine {
        Engine::new(44100.0, 64)
    }

    #[test]
    fn test_new_engine_has_only_the_sink() {
        let engine = engine();
        assert_eq!(engine.graph().len(), 1);
        assert_eq!(engine.graph().get(SINK_ID).unwrap().type_id, SINK_TYPE);
        assert_eq!(engine.schedule().order(), &[SINK_ID]);
    }

    #[test]
    fn test_empty_graph_renders_silence() {
        let mut engine = engine();
        let (left, right) = engine.render();
        assert_eq!(left.len(), 64);
        assert!(left.iter().all(|&s| s == 0.0));
        assert!(right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_add_connect_render() {
        let mut engine = engine();
        let osc = engine.add_node("osc.sine").unwrap();
        engine.connect(osc, 0, SINK_ID, 0).unwrap();

        let (left, right) = engine.render();
        assert!(left.iter().any(|&s| s.abs() > 0.01));
        assert!(right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_tick_advances_per_render() {
        let mut engine = engine();
        assert_eq!(engine.tick(), 0);
        engine.render();
        engine.render();
        assert_eq!(engine.tick(), 2);
    }

    #[test]
    fn test_node_ids_are_never_reused() {
        let mut engine = engine();
        let first = engine.add_node("osc.sine").unwrap();
        assert!(engine.remove_node(first));
        let second = engine.add_node("osc.sine").unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_sink_cannot_be_removed() {
        let mut engine = engine();
        assert!(!engine.remove_node(SINK_ID));
        assert!(engine.graph().contains(SINK_ID));
    }

    #[test]
    fn test_second_sink_is_refused() {
        let mut engine = engine();
        assert!(matches!(
            engine.add_node(SINK_TYPE),
            Err(StructuralError::DuplicateSink(_))
        ));
        assert_eq!(engine.graph().len(), 1);
    }

    #[test]
    fn test_remove_node_strips_connections_and_silences() {
        let mut engine = engine();
        let osc = engine.add_node("osc.sine").unwrap();
        engine.connect(osc, 0, SINK_ID, 0).unwrap();
        engine.remove_node(osc);

        assert_eq!(engine.graph().connections().count(), 0);
        let (left, _) = engine.render();
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_connect_validates_kinds() {
        let mut engine = engine();
        let value = engine.add_node("util.value").unwrap();
        assert!(matches!(
            engine.connect(value, 0, SINK_ID, 0),
            Err(StructuralError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_connect_rejects_duplicates() {
        let mut engine = engine();
        let osc = engine.add_node("osc.sine").unwrap();
        engine.connect(osc, 0, SINK_ID, 0).unwrap();
        assert!(matches!(
            engine.connect(osc, 0, SINK_ID, 0),
            Err(StructuralError::DuplicateConnection { .. })
        ));
    }

    #[test]
    fn test_connect_reverts_on_cycle() {
        let mut engine = engine();
        let a = engine.add_node("fx.gain").unwrap();
        let b = engine.add_node("fx.gain").unwrap();
        engine.connect(a, 0, SINK_ID, 0).unwrap();
        engine.connect(b, 0, a, 0).unwrap();

        let edges_before = engine.graph().connections().count();
        assert!(matches!(
            engine.connect(a, 0, b, 0),
            Err(StructuralError::Cycle(_))
        ));
        assert_eq!(engine.graph().connections().count(), edges_before);
        // Still renderable after the revert.
        engine.render();
    }

    #[test]
    fn test_set_parameter_checks_name_and_kind() {
        let mut engine = engine();
        let osc = engine.add_node("osc.sine").unwrap();

        assert!(engine
            .set_parameter(osc, "freq", ParamValue::Float(880.0))
            .is_ok());
        assert_eq!(
            engine.graph().get(osc).unwrap().param("freq"),
            Some(&ParamValue::Float(880.0))
        );

        assert!(matches!(
            engine.set_parameter(osc, "wobble", ParamValue::Float(1.0)),
            Err(StructuralError::UnknownParameter { .. })
        ));
        assert_eq!(
            engine.set_parameter(osc, "freq", ParamValue::Int(880)),
            Err(StructuralError::ParamKindMismatch {
                node: osc,
                name: "freq".to_string(),
                expected: ParamKind::Float,
                found: ParamKind::Int,
            })
        );
    }

    #[test]
    fn test_failed_load_keeps_running_graph() {
        let mut engine = engine();
        engine
            .load("node 0 sink\nin 1.0\n\nnode 1 osc.sine\n")
            .unwrap();
        let before = engine.serialize_patch();

        assert!(engine.load("node 0 sink\nnode 1 osc.unknown\n").is_err());
        assert_eq!(engine.serialize_patch(), before);

        let (left, _) = engine.render();
        assert!(left.iter().any(|&s| s.abs() > 0.01));
    }

    #[test]
    fn test_load_bumps_id_allocator() {
        let mut engine = engine();
        engine
            .load("node 0 sink\n\nnode 7 osc.sine\n")
            .unwrap();
        let next = engine.add_node("osc.sine").unwrap();
        assert!(next > 7);
    }

    #[test]
    fn test_apply_commands_between_blocks() {
        use crate::engine::channels::command_channel;

        let mut engine = engine();
        let (mut tx, mut rx) = command_channel(16);

        tx.send(EngineCommand::AddNode {
            type_id: "osc.sine".to_string(),
        })
        .unwrap();
        tx.send(EngineCommand::Connect {
            from_node: 1,
            from_output: 0,
            to_node: SINK_ID,
            to_input: 0,
        })
        .unwrap();
        // A rejected command must not stall the rest of the queue.
        tx.send(EngineCommand::RemoveNode { node_id: 99 }).unwrap();
        tx.send(EngineCommand::SetParameter {
            node_id: 1,
            name: "freq".to_string(),
            value: ParamValue::Float(220.0),
        })
        .unwrap();

        assert_eq!(engine.apply_commands(&mut rx), 4);
        let (left, _) = engine.render();
        assert!(left.iter().any(|&s| s.abs() > 0.01));
    }

    #[derive(Default)]
    struct NanSource;

    impl NodeProcessor for NanSource {
        fn info(&self) -> &NodeInfo {
            static INFO: NodeInfo = NodeInfo::new("test.nan", "NaN Source", "Emits non-finite samples");
            &INFO
        }

        fn inputs(&self) -> &[PortDefinition] {
            &[]
        }

        fn outputs(&self) -> &[PortDefinition] {
            const PORTS: [PortDefinition; 1] = [PortDefinition::audio("out", "Out")];
            &PORTS
        }

        fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

        fn process(
            &mut self,
            _inputs: &[SignalBuffer],
            outputs: &mut [SignalBuffer],
            _context: &ProcessContext,
        ) {
            if let Some(out) = outputs[0].samples_mut() {
                out.fill(f32::NAN);
            }
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn test_non_finite_output_is_contained() {
        let mut engine = engine();
        engine.register_node_type::<NanSource>();
        let nan = engine.add_node("test.nan").unwrap();
        engine.connect(nan, 0, SINK_ID, 0).unwrap();

        let (left, _) = engine.render();
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Engine>();
    }
}
