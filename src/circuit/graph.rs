//! Circuit graph structure.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;

use super::node::OpNode;
use super::types::{Depth, NodeKind};
use crate::error::{LevelerError, Result};
use crate::functions;

/// A homomorphic circuit: the sole owner of its operation nodes.
///
/// Nodes are keyed by name and kept in insertion order, which makes
/// rendering deterministic. Edges are stored on the nodes themselves as
/// operand lists (producer names) and consumer sets (back-references).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitGraph {
    /// All nodes, by name, in insertion order
    nodes: IndexMap<String, OpNode>,
    /// Designated inputs, in declaration order
    inputs: Vec<String>,
    /// Designated outputs, in declaration order
    outputs: Vec<String>,
    /// Counter for auto-generated names, scoped to this graph
    next_id: usize,
}

impl CircuitGraph {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the circuit has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Find a node by name.
    pub fn node(&self, name: &str) -> Option<&OpNode> {
        self.nodes.get(name)
    }

    /// Find a node by name, mutably.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut OpNode> {
        self.nodes.get_mut(name)
    }

    /// Find a node by name or report it missing.
    pub fn get(&self, name: &str) -> Result<&OpNode> {
        self.nodes.get(name).ok_or_else(|| LevelerError::not_found(name))
    }

    /// Find a node by name mutably or report it missing.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut OpNode> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| LevelerError::not_found(name))
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &OpNode> {
        self.nodes.values()
    }

    /// Node names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Designated input names.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Designated output names.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Number of nodes of the given kind.
    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|n| n.kind == kind).count()
    }

    /// Draw a name of the form `<prefix>_<n>` not yet used in this graph.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{}_{}", prefix, self.next_id);
            self.next_id += 1;
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Insert a node without wiring its edges.
    ///
    /// Inputs and output-flagged nodes are also recorded in the designated
    /// input/output lists.
    pub fn add_node(&mut self, node: OpNode) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(LevelerError::DuplicateNode { name: node.name });
        }
        if node.kind == NodeKind::Input {
            self.inputs.push(node.name.clone());
        }
        if node.is_output {
            self.outputs.push(node.name.clone());
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Record `name` as a consumer of each of its operands.
    pub fn wire(&mut self, name: &str) -> Result<()> {
        let operands = self.get(name)?.distinct_operands();
        if let Some(missing) = operands.iter().find(|op| !self.contains(op)) {
            return Err(LevelerError::not_found(missing.as_str()));
        }
        for operand in operands {
            self.get_mut(&operand)?.consumers.insert(name.to_string());
        }
        Ok(())
    }

    /// Create an operation through the node factory, insert and wire it.
    ///
    /// Nothing is mutated if the operation is unknown, the arity is wrong,
    /// the name is taken or an operand is missing.
    pub fn insert_op(&mut self, op: &str, operands: &[&str], name: Option<&str>) -> Result<String> {
        if let Some(missing) = operands.iter().find(|op| !self.contains(op)) {
            return Err(LevelerError::not_found(*missing));
        }
        if let Some(name) = name {
            if self.contains(name) {
                return Err(LevelerError::DuplicateNode {
                    name: name.to_string(),
                });
            }
        }
        let operands = operands.iter().map(|s| s.to_string()).collect();
        let node = functions::make_node(self, op, operands, name)?;
        let name = node.name.clone();
        self.add_node(node)?;
        self.wire(&name)?;
        Ok(name)
    }

    /// Add an input, optionally pinned at a base level.
    pub fn add_input(&mut self, name: &str, depth: Option<Depth>) -> Result<String> {
        self.add_node(OpNode::input(name, depth))?;
        Ok(name.to_string())
    }

    /// Add an output node reading `operand`, optionally pinned at a target level.
    pub fn add_output(&mut self, name: &str, operand: &str, target: Option<Depth>) -> Result<String> {
        if !self.contains(operand) {
            return Err(LevelerError::not_found(operand));
        }
        self.add_node(OpNode::output(name, operand, target))?;
        self.wire(name)?;
        Ok(name.to_string())
    }

    /// Flag an existing node as a circuit output.
    pub fn mark_output(&mut self, name: &str) -> Result<()> {
        let node = self.get_mut(name)?;
        if !node.is_output {
            node.is_output = true;
            self.outputs.push(name.to_string());
        }
        Ok(())
    }

    /// Remove a node from the graph.
    ///
    /// The caller must have detached every edge referencing it first.
    pub fn remove_node(&mut self, name: &str) -> Result<OpNode> {
        let node = self.get(name)?;
        if let Some(consumer) = node.consumers.iter().next() {
            return Err(LevelerError::NodeStillReferenced {
                node: name.to_string(),
                by: consumer.clone(),
            });
        }
        if let Some(other) = self
            .nodes
            .values()
            .find(|n| n.name != name && (n.has_operand(name) || n.consumers.contains(name)))
        {
            return Err(LevelerError::NodeStillReferenced {
                node: name.to_string(),
                by: other.name.clone(),
            });
        }

        let node = self
            .nodes
            .shift_remove(name)
            .ok_or_else(|| LevelerError::not_found(name))?;
        self.inputs.retain(|n| n != name);
        self.outputs.retain(|n| n != name);
        Ok(node)
    }

    /// Repoint every operand slot of `consumer` reading `old` to `new`.
    ///
    /// Returns the number of slots rewritten. Consumer sets are left to the
    /// caller.
    pub fn replace_operand(&mut self, consumer: &str, old: &str, new: &str) -> Result<usize> {
        let node = self.get_mut(consumer)?;
        let mut rewritten = 0;
        for operand in node.operands.iter_mut().filter(|op| op.as_str() == old) {
            *operand = new.to_string();
            rewritten += 1;
        }
        if rewritten == 0 {
            return Err(LevelerError::EdgeRewriteFailed {
                consumer: consumer.to_string(),
                operand: old.to_string(),
            });
        }
        Ok(rewritten)
    }

    /// Node names ordered so that every producer precedes its consumers.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut pending: HashMap<&str, usize> = self
            .nodes
            .values()
            .map(|n| (n.name.as_str(), n.distinct_operands().len()))
            .collect();
        let mut ready: VecDeque<&str> = self
            .nodes
            .values()
            .filter(|n| n.operands.is_empty())
            .map(|n| n.name.as_str())
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(name) = ready.pop_front() {
            order.push(name.to_string());
            for consumer in &self.get(name)?.consumers {
                let mismatch = || LevelerError::InvalidTopology {
                    message: format!("'{}' lists consumer '{}' which does not read it", name, consumer),
                };
                if !self.get(consumer)?.has_operand(name) {
                    return Err(mismatch());
                }
                let count = pending
                    .get_mut(consumer.as_str())
                    .ok_or_else(|| LevelerError::not_found(consumer.as_str()))?;
                *count = count.checked_sub(1).ok_or_else(mismatch)?;
                if *count == 0 {
                    ready.push_back(consumer.as_str());
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(LevelerError::InvalidTopology {
                message: "circuit contains a cycle".to_string(),
            });
        }
        Ok(order)
    }

    /// Highest assigned output level in the circuit.
    pub fn max_depth(&self) -> Option<Depth> {
        self.nodes.values().filter_map(|n| n.output_depth).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> CircuitGraph {
        let mut g = CircuitGraph::new();
        g.add_input("x", Some(Depth(2))).unwrap();
        g.add_input("y", Some(Depth(2))).unwrap();
        g.insert_op("add", &["x", "y"], Some("s")).unwrap();
        g.insert_op("mul", &["s", "x"], Some("m")).unwrap();
        g.add_output("o", "m", Some(Depth(1))).unwrap();
        g
    }

    #[test]
    fn test_insert_wires_consumers() {
        let g = diamond();
        assert_eq!(g.len(), 5);
        let x = g.node("x").unwrap();
        assert!(x.consumers.contains("s"));
        assert!(x.consumers.contains("m"));
        assert_eq!(g.inputs(), &["x".to_string(), "y".to_string()]);
        assert_eq!(g.outputs(), &["o".to_string()]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut g = diamond();
        let err = g.insert_op("neg", &["x"], Some("s")).unwrap_err();
        assert!(matches!(err, LevelerError::DuplicateNode { .. }));
        assert_eq!(g.len(), 5);
    }

    #[test]
    fn test_missing_operand_no_mutation() {
        let mut g = diamond();
        let before = g.clone();
        let err = g.insert_op("add", &["x", "nope"], None).unwrap_err();
        assert!(matches!(err, LevelerError::NodeNotFound { .. }));
        assert_eq!(g, before);
    }

    #[test]
    fn test_fresh_names_unique() {
        let mut g = CircuitGraph::new();
        g.add_input("lr_0", None).unwrap();
        let a = g.fresh_name("lr");
        let b = g.fresh_name("lr");
        assert_ne!(a, "lr_0");
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_requires_detached() {
        let mut g = diamond();
        let err = g.remove_node("s").unwrap_err();
        assert!(matches!(err, LevelerError::NodeStillReferenced { .. }));

        g.add_input("z", None).unwrap();
        let removed = g.remove_node("z").unwrap();
        assert_eq!(removed.name, "z");
        assert!(!g.inputs().contains(&"z".to_string()));
    }

    #[test]
    fn test_replace_operand() {
        let mut g = CircuitGraph::new();
        g.add_input("x", None).unwrap();
        g.add_input("y", None).unwrap();
        g.insert_op("mul", &["x", "x"], Some("m")).unwrap();
        assert_eq!(g.replace_operand("m", "x", "y").unwrap(), 2);
        let err = g.replace_operand("m", "x", "y").unwrap_err();
        assert!(matches!(err, LevelerError::EdgeRewriteFailed { .. }));
    }

    #[test]
    fn test_topological_order() {
        let g = diamond();
        let order = g.topological_order().unwrap();
        let pos = |n: &str| order.iter().position(|o| o == n).unwrap();
        assert!(pos("x") < pos("s"));
        assert!(pos("s") < pos("m"));
        assert!(pos("m") < pos("o"));
    }

    #[test]
    fn test_topological_order_rejects_one_sided_edge() {
        let mut g = diamond();
        g.get_mut("x").unwrap().consumers.insert("y".into());
        let err = g.topological_order().unwrap_err();
        assert!(matches!(err, LevelerError::InvalidTopology { .. }));
    }
}
