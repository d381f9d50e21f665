//! Circuit validation.

use crate::error::{LevelerError, Result};

use super::{CircuitGraph, NodeKind};

/// Validate the structure of a circuit.
///
/// Checks:
/// - Every operand and consumer name resolves (no dangling edges)
/// - Every node's operand count matches its kind's arity
/// - Operand and consumer links are symmetric
/// - Designated inputs are Input nodes and designated outputs are flagged
pub fn validate_graph(graph: &CircuitGraph) -> Result<()> {
    for node in graph.nodes() {
        if node.operands.len() != node.kind.arity() {
            return Err(LevelerError::arity(
                node.name.as_str(),
                node.kind.arity(),
                node.operands.len(),
            ));
        }

        for operand in &node.operands {
            let producer = graph.get(operand)?;
            if !producer.consumers.contains(&node.name) {
                return Err(LevelerError::InvalidTopology {
                    message: format!(
                        "'{}' reads '{}' but is not among its consumers",
                        node.name, operand
                    ),
                });
            }
        }

        for consumer in &node.consumers {
            if !graph.get(consumer)?.has_operand(&node.name) {
                return Err(LevelerError::InvalidTopology {
                    message: format!(
                        "'{}' lists consumer '{}' which does not read it",
                        node.name, consumer
                    ),
                });
            }
        }
    }

    for input in graph.inputs() {
        if graph.get(input)?.kind != NodeKind::Input {
            return Err(LevelerError::InvalidTopology {
                message: format!("designated input '{}' is not an input node", input),
            });
        }
    }
    for output in graph.outputs() {
        if !graph.get(output)?.is_output {
            return Err(LevelerError::InvalidTopology {
                message: format!("designated output '{}' is not flagged", output),
            });
        }
    }

    Ok(())
}

/// Check that every edge of a balanced circuit is level-consistent.
///
/// For each operand edge `p -> n`: `p` produces exactly the level `n`
/// requires, and every reduction strictly lowers the level.
pub fn validate_levels(graph: &CircuitGraph) -> Result<()> {
    for node in graph.nodes() {
        if node.kind == NodeKind::LevelReduce {
            match (node.input_depth, node.output_depth) {
                (Some(input), Some(output)) if input > output => {}
                _ => {
                    return Err(LevelerError::InvalidTopology {
                        message: format!(
                            "reduction '{}' does not lower the level ({:?} -> {:?})",
                            node.name, node.input_depth, node.output_depth
                        ),
                    })
                }
            }
        }

        if node.operands.is_empty() {
            continue;
        }
        let required = node.required_input().ok_or_else(|| LevelerError::InvalidTopology {
            message: format!("'{}' has no assigned level", node.name),
        })?;
        for operand in node.distinct_operands() {
            let produced = graph.get(&operand)?.output_depth;
            if produced != Some(required) {
                return Err(LevelerError::DepthConflict {
                    producer: operand,
                    consumers: vec![node.name.clone()],
                    producer_depth: produced.unwrap_or_default(),
                    required_depth: required,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Depth, OpNode};

    #[test]
    fn test_valid_graph() {
        let mut g = CircuitGraph::new();
        g.add_input("x", None).unwrap();
        g.insert_op("neg", &["x"], Some("n")).unwrap();
        g.add_output("o", "n", None).unwrap();
        validate_graph(&g).unwrap();
    }

    #[test]
    fn test_dangling_operand() {
        let mut g = CircuitGraph::new();
        g.add_node(OpNode::new("n", NodeKind::Negate, vec!["ghost".into()]))
            .unwrap();
        let err = validate_graph(&g).unwrap_err();
        assert!(matches!(err, LevelerError::NodeNotFound { ref node } if node == "ghost"));
    }

    #[test]
    fn test_unwired_edge() {
        let mut g = CircuitGraph::new();
        g.add_input("x", None).unwrap();
        g.add_node(OpNode::new("n", NodeKind::Negate, vec!["x".into()]))
            .unwrap();
        let err = validate_graph(&g).unwrap_err();
        assert!(matches!(err, LevelerError::InvalidTopology { .. }));
    }

    #[test]
    fn test_levels_mismatch() {
        let mut g = CircuitGraph::new();
        g.add_input("x", Some(Depth(3))).unwrap();
        g.add_output("o", "x", Some(Depth(1))).unwrap();
        let err = validate_levels(&g).unwrap_err();
        assert!(matches!(
            err,
            LevelerError::DepthConflict {
                producer_depth: Depth(3),
                required_depth: Depth(1),
                ..
            }
        ));
    }
}
