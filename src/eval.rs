//! Plaintext evaluation of circuits.
//!
//! Walks a graph in topological order and computes each node through an
//! [`Evaluator`]. Used to check that balancing preserves what a circuit
//! computes: level reductions change how much noise budget a ciphertext has
//! left, never the value it decrypts to.

use std::collections::HashMap;
use std::fmt::Display;

use indexmap::IndexMap;
use tracing::debug;

use crate::circuit::{CircuitGraph, Depth, NodeKind, OpNode};
use crate::error::{LevelerError, Result};
use crate::params::{ParamContext, PLAINTEXT_MODULUS};

/// Arithmetic backend for [`evaluate`].
pub trait Evaluator {
    /// Value flowing along the circuit's edges
    type Value: Clone;

    /// Homomorphic addition
    fn add(&mut self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Homomorphic multiplication
    fn multiply(&mut self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Homomorphic negation
    fn negate(&mut self, a: &Self::Value) -> Self::Value;

    /// Lower a value's level from `from` to `to`
    fn level_reduce(&mut self, a: &Self::Value, from: Depth, to: Depth) -> Self::Value;
}

/// Evaluator over integers modulo the plaintext modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaintextEvaluator {
    modulus: u64,
}

impl PlaintextEvaluator {
    /// Create an evaluator working modulo `modulus`.
    pub fn new(modulus: u64) -> Result<Self> {
        if modulus < 2 {
            return Err(LevelerError::evaluation(
                PLAINTEXT_MODULUS,
                format!("modulus must be at least 2, got {}", modulus),
            ));
        }
        Ok(Self { modulus })
    }

    /// Create an evaluator from the `plaintext_modulus` parameter.
    pub fn from_params(params: &ParamContext) -> Result<Self> {
        Self::new(params.require(PLAINTEXT_MODULUS)?)
    }

    /// Plaintext modulus every value is reduced by.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }
}

impl Evaluator for PlaintextEvaluator {
    type Value = u64;

    fn add(&mut self, a: &u64, b: &u64) -> u64 {
        ((*a as u128 + *b as u128) % self.modulus as u128) as u64
    }

    fn multiply(&mut self, a: &u64, b: &u64) -> u64 {
        ((*a as u128 * *b as u128) % self.modulus as u128) as u64
    }

    fn negate(&mut self, a: &u64) -> u64 {
        (self.modulus - *a % self.modulus) % self.modulus
    }

    fn level_reduce(&mut self, a: &u64, _from: Depth, _to: Depth) -> u64 {
        *a
    }
}

/// Evaluate every node of `graph`.
///
/// `inputs` must hold a value for each input node. Returns the values of
/// all nodes in topological order.
pub fn evaluate<E: Evaluator>(
    graph: &CircuitGraph,
    evaluator: &mut E,
    inputs: &HashMap<String, E::Value>,
) -> Result<IndexMap<String, E::Value>> {
    let order = graph.topological_order()?;
    let mut values: IndexMap<String, E::Value> = IndexMap::with_capacity(order.len());

    for name in order {
        let node = graph.get(&name)?;
        let operand = |i: usize| operand_value(&values, node, i);

        let value = match node.kind {
            NodeKind::Input => inputs
                .get(&name)
                .cloned()
                .ok_or_else(|| LevelerError::evaluation(&name, "no value given for input"))?,
            NodeKind::Output => operand(0)?.clone(),
            NodeKind::Add => {
                let (a, b) = (operand(0)?, operand(1)?);
                evaluator.add(a, b)
            }
            NodeKind::Multiply => {
                let (a, b) = (operand(0)?, operand(1)?);
                evaluator.multiply(a, b)
            }
            NodeKind::Negate => evaluator.negate(operand(0)?),
            NodeKind::LevelReduce => {
                let (from, to) = match (node.input_depth, node.output_depth) {
                    (Some(from), Some(to)) => (from, to),
                    _ => return Err(LevelerError::evaluation(&name, "reduction has no levels")),
                };
                evaluator.level_reduce(operand(0)?, from, to)
            }
        };
        values.insert(name, value);
    }

    debug!(nodes = values.len(), "evaluated circuit");
    Ok(values)
}

fn operand_value<'v, V>(values: &'v IndexMap<String, V>, node: &OpNode, i: usize) -> Result<&'v V> {
    let producer = node
        .operands
        .get(i)
        .ok_or_else(|| LevelerError::evaluation(node.name.as_str(), format!("missing operand {}", i)))?;
    values
        .get(producer)
        .ok_or_else(|| LevelerError::evaluation(node.name.as_str(), format!("'{}' has no value", producer)))
}

/// Attach each value to its node as a rendering decoration.
pub fn annotate<V: Display>(graph: &mut CircuitGraph, values: &IndexMap<String, V>) -> Result<()> {
    for (name, value) in values {
        graph.get_mut(name)?.decoration = Some(value.to_string());
    }
    Ok(())
}
