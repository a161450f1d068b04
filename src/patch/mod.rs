//! The patch text format: parsing, validation, and serialization.
//!
//! A patch is a line-oriented description of a graph:
//!
//! ```text
//! ; a comment
//! node 0 sink
//! in 1.0
//! in 1.0
//!
//! node 1 osc.sine
//! param freq:880
//! ```
//!
//! `node <id> <type>` opens a node, `param <name>:<value>` sets one of its
//! parameters, and each `in` line declares the node's next input port with
//! its fan-in sources (`<node>.<output>` references; a bare `in` is an
//! unconnected port). Loading is atomic: any error rejects the whole patch.

pub mod loader;
pub mod writer;

pub use loader::{parse_patch, LoadedPatch};
pub use writer::serialize_graph;

use thiserror::Error;

use crate::graph::StructuralError;

use crate::dsp::parameter::ParamKind;

/// A line that could not be understood at all.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: expected 'node <id> <type>', got '{text}'")]
    MalformedNodeLine { line: usize, text: String },

    #[error("line {line}: '{text}' is not a valid node id")]
    InvalidNodeId { line: usize, text: String },

    #[error("line {line}: '{directive}' before any 'node' line")]
    DirectiveOutsideNode { line: usize, directive: String },

    #[error("line {line}: expected 'param <name>:<value>', got '{text}'")]
    MalformedParam { line: usize, text: String },

    #[error("line {line}: '{text}' is not a valid {kind} for parameter '{name}'")]
    BadLiteral {
        line: usize,
        name: String,
        kind: ParamKind,
        text: String,
    },

    #[error("line {line}: '{text}' is not a valid input reference (<node>.<output>)")]
    MalformedInputRef { line: usize, text: String },

    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },
}

/// Why a patch was rejected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}
