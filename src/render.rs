//! Graphviz (DOT) rendering of circuits.
//!
//! The output is meant for inspection only:
//!
//! ```text
//! digraph G {
//!   "x" [label="x\n(d=3)\ninput"];
//!   "m" [label="m\n(d=3)\nmul", xlabel="9"];
//!   "x" -> "m";
//!   { rank=same; Inputs "x" }
//!   { rank=same; Outputs "o" }
//! }
//! ```
//!
//! `(d=N)` appears whenever a node's output level is assigned, so a node
//! at level 0 shows `(d=0)`. Unassigned nodes carry no level line.

use std::fmt::{self, Write};

use crate::circuit::{CircuitGraph, OpNode};

/// Render a circuit as a DOT digraph.
pub fn to_dot(graph: &CircuitGraph) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_dot(graph, &mut out);
    out
}

/// Write a circuit as a DOT digraph, nodes in insertion order.
pub fn write_dot<W: Write>(graph: &CircuitGraph, out: &mut W) -> fmt::Result {
    writeln!(out, "digraph G {{")?;

    for node in graph.nodes() {
        write_node(node, out)?;
        for operand in &node.operands {
            writeln!(out, "  {} -> {};", quote(operand), quote(&node.name))?;
        }
    }

    write_rank(out, "Inputs", graph.inputs())?;
    write_rank(out, "Outputs", graph.outputs())?;
    writeln!(out, "}}")
}

fn write_node<W: Write>(node: &OpNode, out: &mut W) -> fmt::Result {
    let mut label = node.name.clone();
    if let Some(depth) = node.output_depth {
        label.push_str(&format!("\n(d={})", depth));
    }
    label.push('\n');
    label.push_str(node.kind.keyword());

    write!(out, "  {} [label={}", quote(&node.name), quote(&label))?;
    if let Some(decoration) = &node.decoration {
        write!(out, ", xlabel={}", quote(decoration))?;
    }
    writeln!(out, "];")
}

fn write_rank<W: Write>(out: &mut W, group: &str, names: &[String]) -> fmt::Result {
    if names.is_empty() {
        return Ok(());
    }
    write!(out, "  {{ rank=same; {}", group)?;
    for name in names {
        write!(out, " {}", quote(name))?;
    }
    writeln!(out, " }}")
}

/// Quote a DOT identifier, escaping quotes, backslashes and newlines.
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Depth;

    #[test]
    fn test_render_small_circuit() {
        let mut g = CircuitGraph::new();
        g.add_input("x", Some(Depth(3))).unwrap();
        g.insert_op("mul", &["x", "x"], Some("m")).unwrap();
        g.add_output("o", "m", None).unwrap();
        g.get_mut("m").unwrap().decoration = Some("9".into());

        let dot = to_dot(&g);
        let expected = "digraph G {\n\
            \x20 \"x\" [label=\"x\\n(d=3)\\ninput\"];\n\
            \x20 \"m\" [label=\"m\\nmul\", xlabel=\"9\"];\n\
            \x20 \"x\" -> \"m\";\n\
            \x20 \"x\" -> \"m\";\n\
            \x20 \"o\" [label=\"o\\noutput\"];\n\
            \x20 \"m\" -> \"o\";\n\
            \x20 { rank=same; Inputs \"x\" }\n\
            \x20 { rank=same; Outputs \"o\" }\n\
            }\n";
        assert_eq!(dot, expected);
    }

    #[test]
    fn test_zero_depth_is_shown() {
        let mut g = CircuitGraph::new();
        g.add_input("x", Some(Depth(0))).unwrap();
        assert!(to_dot(&g).contains("(d=0)"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("q/t"), "\"q/t\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
