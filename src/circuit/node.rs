//! Operation nodes.

use std::collections::BTreeSet;

use super::types::{Depth, NodeKind};

/// One homomorphic operation in a circuit.
///
/// Links to other nodes are names resolved through the owning
/// [`CircuitGraph`](super::CircuitGraph); a node never owns its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpNode {
    /// Unique name within the owning graph
    pub name: String,
    /// Operation kind (fixes arity and depth-transfer rule)
    pub kind: NodeKind,
    /// Ordered producer names; may repeat (e.g. `mul x x`)
    pub operands: Vec<String>,
    /// Names of nodes consuming this node's output
    pub consumers: BTreeSet<String>,
    /// Level every operand must present at the edge into this node
    pub input_depth: Option<Depth>,
    /// Level this node produces; `None` until assigned
    pub output_depth: Option<Depth>,
    /// Output level was fixed externally and may not be raised
    pub pinned: bool,
    /// Designated circuit output
    pub is_output: bool,
    /// Free-form value shown next to the node when rendering
    pub decoration: Option<String>,
}

impl OpNode {
    /// Create an unwired node with unassigned levels.
    pub fn new(name: impl Into<String>, kind: NodeKind, operands: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            operands,
            consumers: BTreeSet::new(),
            input_depth: None,
            output_depth: None,
            pinned: false,
            is_output: kind == NodeKind::Output,
            decoration: None,
        }
    }

    /// Create an input whose level is fixed by the numeric engine.
    pub fn input(name: impl Into<String>, depth: Option<Depth>) -> Self {
        let mut node = Self::new(name, NodeKind::Input, Vec::new());
        node.output_depth = depth;
        node.pinned = depth.is_some();
        node
    }

    /// Create an output reading `operand` at the given target level.
    pub fn output(name: impl Into<String>, operand: impl Into<String>, target: Option<Depth>) -> Self {
        let mut node = Self::new(name, NodeKind::Output, vec![operand.into()]);
        node.output_depth = target;
        node.pinned = target.is_some();
        node
    }

    /// Create a reduction from level `from` down to level `to`.
    pub fn level_reduce(name: impl Into<String>, operand: impl Into<String>, from: Depth, to: Depth) -> Self {
        let mut node = Self::new(name, NodeKind::LevelReduce, vec![operand.into()]);
        node.input_depth = Some(from);
        node.output_depth = Some(to);
        node
    }

    /// Distinct operand names, in first-occurrence order.
    pub fn distinct_operands(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.operands
            .iter()
            .filter(|op| seen.insert(op.as_str()))
            .cloned()
            .collect()
    }

    /// Whether `name` feeds this node.
    pub fn has_operand(&self, name: &str) -> bool {
        self.operands.iter().any(|op| op == name)
    }

    /// Level this node requires from its operands, if it can be derived.
    ///
    /// Reductions keep their own stored input level, which never falls
    /// below what they produce.
    pub fn required_input(&self) -> Option<Depth> {
        let output = self.output_depth?;
        match self.kind.transfer(output) {
            Some(depth) => Some(depth),
            None if self.kind.is_reduction() => {
                Some(self.input_depth.map_or(output, |stored| stored.max(output)))
            }
            None => None,
        }
    }
}
