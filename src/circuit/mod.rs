//! Circuit graph representation and validation.
//!
//! This module provides the operation-node model and the [`CircuitGraph`]
//! container that owns every node of one homomorphic circuit. Nodes refer to
//! each other by name; the graph resolves those names.

mod graph;
mod node;
mod types;
mod validate;

pub use graph::CircuitGraph;
pub use node::OpNode;
pub use types::*;
pub use validate::{validate_graph, validate_levels};
