//! Error types for the circuit leveler.
//!
//! This module provides a unified error type [`LevelerError`] that covers
//! all error conditions that can occur during DSL parsing, circuit
//! construction, level balancing and evaluation.

use thiserror::Error;

use crate::circuit::{Depth, NodeKind};

/// Result type alias using [`LevelerError`].
pub type Result<T> = std::result::Result<T, LevelerError>;

/// Unified error type for all leveler operations.
#[derive(Error, Debug)]
pub enum LevelerError {
    // ============ DSL Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    // ============ Construction Errors ============
    /// A node with this name already exists in the graph
    #[error("Duplicate node name '{name}'")]
    DuplicateNode { name: String },

    /// A function with this name is already registered
    #[error("Duplicate function name '{name}'")]
    DuplicateFunction { name: String },

    /// The factory does not know this operation kind
    #[error("Unknown operation '{op}'")]
    UnknownOperation { op: String },

    /// The function table has no entry with this name
    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    /// Wrong number of operands or arguments
    #[error("'{name}' expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Only arithmetic kinds can back a built-in function
    #[error("'{name}' cannot be registered as a built-in: '{kind}' is not an arithmetic operation")]
    InvalidBuiltin { name: String, kind: NodeKind },

    /// Built-in functions are expanded by the factory, not instantiated
    #[error("Function '{name}' is a built-in and cannot be instantiated")]
    NotInstantiable { name: String },

    // ============ Graph Consistency Errors ============
    /// Node not found in the graph
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// An operand rewrite did not find the expected producer
    #[error("Cannot rewire '{consumer}': '{operand}' is not one of its operands")]
    EdgeRewriteFailed { consumer: String, operand: String },

    /// A node cannot be removed while edges still reference it
    #[error("Node '{node}' is still referenced by '{by}'")]
    NodeStillReferenced { node: String, by: String },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Depth Errors ============
    /// Consumers of one producer require levels that cannot be reconciled
    #[error(
        "Depth conflict at '{producer}': now at level {producer_depth}, but {consumers:?} require level {required_depth}"
    )]
    DepthConflict {
        producer: String,
        consumers: Vec<String>,
        producer_depth: Depth,
        required_depth: Depth,
    },

    /// The balancer would have to raise a node whose level is externally fixed
    #[error("Node '{node}' is pinned at level {pinned}, but '{consumer}' requires level {required}")]
    PinnedDepth {
        node: String,
        consumer: String,
        pinned: Depth,
        required: Depth,
    },

    /// A balancing pass was seeded from a node without an output level
    #[error("Cannot balance from '{node}': its output level is unassigned")]
    RootDepthUnassigned { node: String },

    // ============ Configuration / Evaluation Errors ============
    /// A required named parameter is absent from the context
    #[error("Missing parameter '{name}'")]
    MissingParameter { name: String },

    /// The numeric engine could not evaluate a node
    #[error("Evaluation failed at '{node}': {message}")]
    Evaluation { node: String, message: String },

    // ============ I/O Errors ============
    /// Error reading circuit file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing the rendered graph
    #[error("Failed to write '{path}': {source}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LevelerError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create a node-not-found error
    pub fn not_found(node: impl Into<String>) -> Self {
        Self::NodeNotFound { node: node.into() }
    }

    /// Create an arity mismatch error
    pub fn arity(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ArityMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create an evaluation error
    pub fn evaluation(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            node: node.into(),
            message: message.into(),
        }
    }
}
