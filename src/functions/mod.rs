//! Function table and node factory.
//!
//! The [`FunctionTable`] is the symbol table circuit builders resolve
//! operation names through. It holds two kinds of entries:
//!
//! - **Built-ins** (`add`, `mul`, `neg`): expanded directly to a single
//!   [`OpNode`](crate::circuit::OpNode) by [`make_node`].
//! - **User-defined functions**: a list of formal parameters plus a body
//!   [`CircuitGraph`] used as a template. Calls are expanded by cloning the
//!   body and rebinding its parameter placeholders to the caller's
//!   argument nodes.
//!
//! ```text
//! .func square a        body:  a (input) --> t = mul a a   (result)
//!   t = mul a a
//!   .return t           call:  q = square s
//! .end                  clone: s --> q/t = mul s s
//! ```

mod factory;

pub use factory::make_node;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::circuit::{validate_graph, CircuitGraph, NodeKind};
use crate::error::{LevelerError, Result};

/// An entry in the function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionDef {
    /// Operation expanded by the node factory
    Builtin {
        name: String,
        kind: NodeKind,
    },
    /// Function with a body subgraph, expanded by inlining
    UserDefined {
        name: String,
        params: Vec<String>,
        body: CircuitGraph,
    },
}

impl FunctionDef {
    /// Function name.
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin { name, .. } | Self::UserDefined { name, .. } => name,
        }
    }

    /// Number of arguments a call takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::Builtin { kind, .. } => kind.arity(),
            Self::UserDefined { params, .. } => params.len(),
        }
    }

    /// Whether this entry is expanded by the factory.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }
}

/// A user function body with its parameters rebound to call arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Cloned body, placeholders removed
    pub body: CircuitGraph,
    /// Names standing for the function's results, in declaration order
    pub results: Vec<String>,
}

/// Symbol table of known operations, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    entries: IndexMap<String, FunctionDef>,
}

impl FunctionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the built-in arithmetic operations.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for kind in [NodeKind::Add, NodeKind::Multiply, NodeKind::Negate] {
            table
                .entries
                .insert(kind.keyword().to_string(), FunctionDef::Builtin {
                    name: kind.keyword().to_string(),
                    kind,
                });
        }
        table
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry.
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.entries.get(name)
    }

    /// Whether a function with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of arguments `name` takes, if registered.
    pub fn arity_of(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(FunctionDef::arity)
    }

    /// Register a built-in under `name`, expanding to a node of `kind`.
    pub fn register_builtin(&mut self, name: &str, kind: NodeKind) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(LevelerError::DuplicateFunction {
                name: name.to_string(),
            });
        }
        if matches!(kind, NodeKind::Input | NodeKind::Output | NodeKind::LevelReduce) {
            return Err(LevelerError::InvalidBuiltin {
                name: name.to_string(),
                kind,
            });
        }
        self.entries.insert(name.to_string(), FunctionDef::Builtin {
            name: name.to_string(),
            kind,
        });
        Ok(())
    }

    /// Register a user-defined function.
    ///
    /// Every parameter must name an input of `body`, every input of `body`
    /// must be a parameter, and `body` must flag at least one result with
    /// [`CircuitGraph::mark_output`]. The table is unchanged on failure.
    pub fn register_function(&mut self, name: &str, params: Vec<String>, body: CircuitGraph) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(LevelerError::DuplicateFunction {
                name: name.to_string(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(dup) = params.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(LevelerError::InvalidTopology {
                message: format!("function '{}' declares parameter '{}' twice", name, dup),
            });
        }
        for param in &params {
            match body.node(param) {
                Some(node) if node.kind == NodeKind::Input => {}
                _ => {
                    return Err(LevelerError::InvalidTopology {
                        message: format!("parameter '{}' of '{}' is not a body input", param, name),
                    })
                }
            }
        }
        if let Some(free) = body.inputs().iter().find(|i| !seen.contains(i.as_str())) {
            return Err(LevelerError::InvalidTopology {
                message: format!("input '{}' of '{}' is not a parameter", free, name),
            });
        }
        if body.count_kind(NodeKind::Output) > 0 {
            return Err(LevelerError::InvalidTopology {
                message: format!("body of '{}' may not contain output nodes", name),
            });
        }
        if body.outputs().is_empty() {
            return Err(LevelerError::InvalidTopology {
                message: format!("function '{}' returns nothing", name),
            });
        }
        validate_graph(&body)?;

        debug!(function = name, params = params.len(), nodes = body.len(), "registered function");
        self.entries.insert(name.to_string(), FunctionDef::UserDefined {
            name: name.to_string(),
            params,
            body,
        });
        Ok(())
    }

    /// Clone the body of `name` with its parameters rebound to `args`.
    ///
    /// Each operand reference to the i-th parameter placeholder is replaced
    /// by `args[i]`, and the placeholders are removed from the clone. The
    /// clone's operands therefore name nodes outside of it.
    pub fn instantiate(&self, name: &str, args: &[String]) -> Result<Instance> {
        let (params, body) = self.user_function(name, args.len())?;
        if let Some(clash) = args
            .iter()
            .find(|a| body.contains(a) && !params.contains(a))
        {
            return Err(LevelerError::DuplicateNode {
                name: clash.clone(),
            });
        }
        let (body, results) = rebind(body, params, args)?;
        Ok(Instance { body, results })
    }

    /// Inline a call to `name` into `graph`.
    ///
    /// The body nodes are copied in under `<prefix>/<node>` names and read
    /// from `args`. Returns the names standing for the function's results,
    /// which may be argument names when the function passes a parameter
    /// through. `graph` is unchanged on failure.
    pub fn inline_call(
        &self,
        graph: &mut CircuitGraph,
        name: &str,
        args: &[String],
        prefix: &str,
    ) -> Result<Vec<String>> {
        let (params, body) = self.user_function(name, args.len())?;
        if let Some(missing) = args.iter().find(|a| !graph.contains(a)) {
            return Err(LevelerError::not_found(missing.as_str()));
        }

        let renamed = rename(body, params, prefix)?;
        if let Some(clash) = renamed
            .nodes()
            .find(|n| !params.contains(&n.name) && graph.contains(&n.name))
        {
            return Err(LevelerError::DuplicateNode {
                name: clash.name.clone(),
            });
        }
        let (clone, results) = rebind(&renamed, params, args)?;

        for node in clone.nodes() {
            let mut node = node.clone();
            node.is_output = false;
            node.input_depth = None;
            node.output_depth = None;
            node.pinned = false;
            graph.add_node(node)?;
        }
        for node in clone.nodes() {
            for arg in node.distinct_operands() {
                if !clone.contains(&arg) {
                    graph.get_mut(&arg)?.consumers.insert(node.name.clone());
                }
            }
        }

        debug!(function = name, prefix, nodes = clone.len(), "inlined call");
        Ok(results)
    }

    fn user_function(&self, name: &str, argc: usize) -> Result<(&[String], &CircuitGraph)> {
        match self.entries.get(name) {
            None => Err(LevelerError::UnknownFunction {
                name: name.to_string(),
            }),
            Some(FunctionDef::Builtin { .. }) => Err(LevelerError::NotInstantiable {
                name: name.to_string(),
            }),
            Some(FunctionDef::UserDefined { params, body, .. }) => {
                if params.len() != argc {
                    return Err(LevelerError::arity(name, params.len(), argc));
                }
                Ok((params, body))
            }
        }
    }
}

/// Copy `body`, renaming every non-parameter node to `<prefix>/<name>`.
fn rename(body: &CircuitGraph, params: &[String], prefix: &str) -> Result<CircuitGraph> {
    let map: HashMap<&str, String> = body
        .nodes()
        .filter(|n| !params.contains(&n.name))
        .map(|n| (n.name.as_str(), format!("{}/{}", prefix, n.name)))
        .collect();
    let lookup = |name: &String| map.get(name.as_str()).cloned().unwrap_or_else(|| name.clone());

    let mut renamed = CircuitGraph::new();
    for node in body.nodes() {
        let mut copy = node.clone();
        copy.name = lookup(&node.name);
        copy.operands = node.operands.iter().map(lookup).collect();
        copy.consumers = node.consumers.iter().map(lookup).collect();
        renamed.add_node(copy)?;
    }
    Ok(renamed)
}

/// Substitute `args` for the parameter placeholders and drop them.
///
/// Returns the rebound graph and the result names, with bare-parameter
/// results resolved to their argument.
fn rebind(body: &CircuitGraph, params: &[String], args: &[String]) -> Result<(CircuitGraph, Vec<String>)> {
    let binding: HashMap<&str, &str> = params
        .iter()
        .map(String::as_str)
        .zip(args.iter().map(String::as_str))
        .collect();
    let resolve = |name: &String| {
        binding
            .get(name.as_str())
            .map_or_else(|| name.clone(), |arg| arg.to_string())
    };

    let mut rebound = CircuitGraph::new();
    for node in body.nodes().filter(|n| !binding.contains_key(n.name.as_str())) {
        let mut node = node.clone();
        node.is_output = false;
        node.operands = node.operands.iter().map(resolve).collect();
        rebound.add_node(node)?;
    }

    let results: Vec<String> = body.outputs().iter().map(resolve).collect();
    for result in &results {
        if rebound.contains(result) {
            rebound.mark_output(result)?;
        }
    }
    Ok((rebound, results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_body() -> CircuitGraph {
        let mut body = CircuitGraph::new();
        body.add_input("a", None).unwrap();
        body.insert_op("mul", &["a", "a"], Some("t")).unwrap();
        body.mark_output("t").unwrap();
        body
    }

    fn mac_body() -> CircuitGraph {
        let mut body = CircuitGraph::new();
        body.add_input("a", None).unwrap();
        body.add_input("b", None).unwrap();
        body.insert_op("mul", &["a", "b"], Some("p")).unwrap();
        body.insert_op("add", &["p", "a"], Some("s")).unwrap();
        body.mark_output("s").unwrap();
        body
    }

    #[test]
    fn test_builtins() {
        let table = FunctionTable::with_builtins();
        assert_eq!(table.arity_of("add"), Some(2));
        assert_eq!(table.arity_of("mul"), Some(2));
        assert_eq!(table.arity_of("neg"), Some(1));
        assert_eq!(table.arity_of("rotate"), None);
        assert!(table.get("add").unwrap().is_builtin());
    }

    #[test]
    fn test_redefinition_fails_without_mutation() {
        let mut table = FunctionTable::with_builtins();
        table.register_function("sq", vec!["a".into()], square_body()).unwrap();
        let before = table.get("sq").cloned();

        let err = table
            .register_function("sq", vec!["a".into(), "b".into()], mac_body())
            .unwrap_err();
        assert!(matches!(err, LevelerError::DuplicateFunction { .. }));
        assert_eq!(table.get("sq").cloned(), before);

        let err = table.register_builtin("add", NodeKind::Add).unwrap_err();
        assert!(matches!(err, LevelerError::DuplicateFunction { .. }));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_non_arithmetic_builtin_rejected() {
        let mut table = FunctionTable::new();
        for kind in [NodeKind::Input, NodeKind::Output, NodeKind::LevelReduce] {
            let err = table.register_builtin("odd", kind).unwrap_err();
            assert!(matches!(err, LevelerError::InvalidBuiltin { ref name, kind: k } if name == "odd" && k == kind));
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_instantiate_rebinds_parameters() {
        let mut table = FunctionTable::new();
        table
            .register_function("mac", vec!["a".into(), "b".into()], mac_body())
            .unwrap();

        let clone = table.instantiate("mac", &["x".into(), "y".into()]).unwrap();
        assert!(!clone.body.contains("a"));
        assert!(!clone.body.contains("b"));
        assert_eq!(clone.body.get("p").unwrap().operands, vec!["x", "y"]);
        assert_eq!(clone.body.get("s").unwrap().operands, vec!["p", "x"]);
        assert_eq!(clone.results, vec!["s".to_string()]);
        assert_eq!(clone.body.outputs(), &["s".to_string()]);
    }

    #[test]
    fn test_instantiate_swapped_arguments() {
        let mut table = FunctionTable::new();
        table
            .register_function("mac", vec!["a".into(), "b".into()], mac_body())
            .unwrap();
        let clone = table.instantiate("mac", &["b".into(), "a".into()]).unwrap();
        assert_eq!(clone.body.get("p").unwrap().operands, vec!["b", "a"]);
        assert_eq!(clone.body.get("s").unwrap().operands, vec!["p", "b"]);
    }

    #[test]
    fn test_instantiate_arity_mismatch() {
        let mut table = FunctionTable::new();
        table
            .register_function("mac", vec!["a".into(), "b".into()], mac_body())
            .unwrap();
        let err = table
            .instantiate("mac", &["x".into(), "y".into(), "z".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            LevelerError::ArityMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_instantiate_errors() {
        let table = FunctionTable::with_builtins();
        assert!(matches!(
            table.instantiate("nope", &[]).unwrap_err(),
            LevelerError::UnknownFunction { .. }
        ));
        assert!(matches!(
            table.instantiate("add", &["x".into(), "y".into()]).unwrap_err(),
            LevelerError::NotInstantiable { .. }
        ));
    }

    #[test]
    fn test_inline_call_arity_mismatch_leaves_graph() {
        let mut table = FunctionTable::with_builtins();
        table
            .register_function("mac", vec!["a".into(), "b".into()], mac_body())
            .unwrap();
        let mut g = CircuitGraph::new();
        for name in ["x", "y", "z"] {
            g.add_input(name, None).unwrap();
        }
        let before = g.clone();
        let err = table
            .inline_call(&mut g, "mac", &["x".into(), "y".into(), "z".into()], "call")
            .unwrap_err();
        assert!(matches!(err, LevelerError::ArityMismatch { .. }));
        assert_eq!(g, before);
    }

    #[test]
    fn test_inline_call_wires_arguments() {
        let mut table = FunctionTable::with_builtins();
        table.register_function("sq", vec!["a".into()], square_body()).unwrap();
        let mut g = CircuitGraph::new();
        g.add_input("x", Some(crate::circuit::Depth(2))).unwrap();

        let results = table.inline_call(&mut g, "sq", &["x".into()], "q").unwrap();
        assert_eq!(results, vec!["q/t".to_string()]);
        let t = g.get("q/t").unwrap();
        assert_eq!(t.operands, vec!["x", "x"]);
        assert!(!t.is_output);
        assert!(g.get("x").unwrap().consumers.contains("q/t"));
        validate_graph(&g).unwrap();
    }

    #[test]
    fn test_identity_function_returns_argument() {
        let mut body = CircuitGraph::new();
        body.add_input("a", None).unwrap();
        body.mark_output("a").unwrap();
        let mut table = FunctionTable::new();
        table.register_function("id", vec!["a".into()], body).unwrap();

        let mut g = CircuitGraph::new();
        g.add_input("x", None).unwrap();
        let results = table.inline_call(&mut g, "id", &["x".into()], "i").unwrap();
        assert_eq!(results, vec!["x".to_string()]);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_register_rejects_free_inputs() {
        let mut body = mac_body();
        body.add_input("c", None).unwrap();
        let mut table = FunctionTable::new();
        let err = table
            .register_function("bad", vec!["a".into(), "b".into()], body)
            .unwrap_err();
        assert!(matches!(err, LevelerError::InvalidTopology { .. }));
        assert!(table.is_empty());
    }
}
