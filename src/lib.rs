//! patchgraph: a pull-based audio node-graph engine.
//!
//! A patch is a directed graph of signal-processing nodes rooted at a
//! single sink. The engine loads patches from a line-oriented text format,
//! computes a cycle-safe evaluation order, and renders fixed-size blocks
//! with fan-in mixing and a single-evaluation guarantee under fan-out.
//! Graph mutation while rendering goes through a lock-free command queue
//! drained between blocks.
//!
//! ```
//! use patchgraph::Engine;
//!
//! let mut engine = Engine::new(44100.0, 256);
//! engine
//!     .load("node 0 sink\nin 1.0\nin 1.0\n\nnode 1 osc.sine\nparam freq:220\n")
//!     .unwrap();
//! let (left, right) = engine.render();
//! assert!(left.iter().any(|&s| s.abs() > 0.01));
//! assert_eq!(left.len(), right.len());
//! ```

pub mod dsp;
pub mod engine;
pub mod graph;
pub mod modules;
pub mod patch;

pub use dsp::{NodeProcessor, NodeRegistry, ParamValue, SignalBuffer, SignalKind};
pub use engine::{command_channel, CommandReceiver, CommandSender, Engine, EngineCommand};
pub use graph::{Graph, NodeId, Schedule, StructuralError, SINK_ID, SINK_TYPE};
pub use patch::{LoadError, ParseError};
