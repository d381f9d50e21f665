//! # Circuit Leveler
//!
//! Level assignment for leveled homomorphic-encryption circuits.
//!
//! In a leveled scheme every ciphertext carries a level: how many more
//! reductions it can undergo. Operands of an operation must meet at the
//! same level, so a compiler has to decide where to lower ciphertexts
//! before they are combined. This library:
//!
//! - Describes circuits with a small line-oriented DSL
//! - Inlines user-defined functions through a function table
//! - Assigns a level to every node and inserts level-reduction
//!   (`modreduce`) nodes wherever producer and consumer disagree
//! - Renders the leveled circuit as a Graphviz DOT graph
//!
//! ## Architecture
//!
//! - [`dsl`] - Parser for the circuit description language
//! - [`builder`] - Lowers a parsed description into a graph
//! - [`circuit`] - Operation nodes, the circuit graph and validation
//! - [`functions`] - Function table, node factory and inlining
//! - [`balance`] - The level balancer
//! - [`render`] - DOT output
//! - [`eval`] - Plaintext evaluation, to check a balanced circuit
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! leveler circuit.lvl --dot leveled.dot
//! dot -Tsvg leveled.dot > leveled.svg
//! ```
//!
//! ### Library
//!
//! ```
//! use circuit_leveler::{builder, dsl, to_dot, LevelBalancer};
//!
//! let ast = dsl::parse("x = input @3\nm = mul x x\no = output m @1").unwrap();
//! let mut graph = builder::build_circuit(&ast).unwrap().graph;
//! LevelBalancer::new().balance(&mut graph).unwrap();
//! assert!(to_dot(&graph).contains("modreduce"));
//! ```
//!
//! ## Level Rules
//!
//! Inputs and outputs are pinned to the levels the circuit declares. An
//! arithmetic node produces the level its operands meet at; a reduction
//! takes its operand at one level and produces a strictly lower one. The
//! balancer works backwards from each output: a node whose level is too
//! high for a consumer gets a reduction inserted after it, a node whose
//! level is too low is raised (its operands then have to follow).

pub mod balance;
pub mod builder;
pub mod circuit;
pub mod dsl;
pub mod error;
pub mod eval;
pub mod functions;
pub mod params;
pub mod render;

// Re-export main types for convenience
pub use balance::{BalanceReport, BalancerConfig, LevelBalancer};
pub use circuit::{CircuitGraph, Depth, NodeKind, OpNode};
pub use error::{LevelerError, Result};
pub use functions::FunctionTable;
pub use render::to_dot;

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmLeveler;
