//! Node factory: maps an operation keyword to a freshly built node.

use crate::circuit::{CircuitGraph, NodeKind, OpNode};
use crate::error::{LevelerError, Result};

/// Build an unwired node of the kind named by `op`.
///
/// Without an explicit `name`, a fresh one is drawn from the graph's
/// counter. Unknown keywords and wrong operand counts are reported and no
/// node is created. The graph itself is only touched to draw a name.
pub fn make_node(
    graph: &mut CircuitGraph,
    op: &str,
    operands: Vec<String>,
    name: Option<&str>,
) -> Result<OpNode> {
    let kind = NodeKind::from_keyword(op).ok_or_else(|| LevelerError::UnknownOperation {
        op: op.to_string(),
    })?;

    if operands.len() != kind.arity() {
        return Err(LevelerError::arity(op, kind.arity(), operands.len()));
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => graph.fresh_name(kind.name_prefix()),
    };

    Ok(match kind {
        NodeKind::Input => OpNode::input(name, None),
        NodeKind::Output => OpNode::output(name, operands[0].clone(), None),
        _ => OpNode::new(name, kind, operands),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_creates_nothing() {
        let mut g = CircuitGraph::new();
        g.add_input("x", None).unwrap();
        let before = g.clone();
        let err = make_node(&mut g, "rotate", vec!["x".into()], None).unwrap_err();
        assert!(matches!(err, LevelerError::UnknownOperation { ref op } if op == "rotate"));
        assert_eq!(g, before);
    }

    #[test]
    fn test_auto_names() {
        let mut g = CircuitGraph::new();
        let a = make_node(&mut g, "neg", vec!["x".into()], None).unwrap();
        let b = make_node(&mut g, "neg", vec!["x".into()], None).unwrap();
        assert!(a.name.starts_with("neg_"));
        assert_ne!(a.name, b.name);
        assert_eq!(a.kind, NodeKind::Negate);
    }

    #[test]
    fn test_arity_checked() {
        let mut g = CircuitGraph::new();
        let err = make_node(&mut g, "mul", vec!["x".into()], Some("m")).unwrap_err();
        assert!(matches!(
            err,
            LevelerError::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_output_is_flagged() {
        let mut g = CircuitGraph::new();
        let out = make_node(&mut g, "output", vec!["x".into()], Some("o")).unwrap();
        assert!(out.is_output);
        assert_eq!(out.operands, vec!["x".to_string()]);
    }
}
