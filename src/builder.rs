//! Circuit construction from a parsed DSL description.
//!
//! Resolves every operation name through a [`FunctionTable`]: built-ins
//! become single nodes, user functions are inlined. Source identifiers are
//! bound to graph node names in a scope, since an inlined result lives
//! under a prefixed name (`q/t`) rather than under the identifier itself.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::circuit::{validate_graph, CircuitGraph, Depth};
use crate::dsl::{CircuitAst, FunctionAst, Statement};
use crate::error::{LevelerError, Result};
use crate::functions::{FunctionDef, FunctionTable};
use crate::params::ParamContext;

/// A circuit built from the DSL, ready for balancing.
#[derive(Debug, Clone)]
pub struct BuiltCircuit {
    /// The circuit graph
    pub graph: CircuitGraph,
    /// Parameters declared with `.param`
    pub params: ParamContext,
    /// Built-ins plus every function declared with `.func`
    pub functions: FunctionTable,
}

/// Build a circuit using the built-in function table.
pub fn build_circuit(ast: &CircuitAst) -> Result<BuiltCircuit> {
    build_with(ast, FunctionTable::with_builtins())
}

/// Build a circuit, registering the AST's functions into `functions`.
pub fn build_with(ast: &CircuitAst, mut functions: FunctionTable) -> Result<BuiltCircuit> {
    let mut params = ParamContext::new();
    for param in &ast.params {
        if params.set(param.name.as_str(), param.value).is_some() {
            return Err(LevelerError::parse(
                param.line,
                format!("parameter '{}' is defined twice", param.name),
            ));
        }
    }

    for function in &ast.functions {
        let body = build_body(function, &functions)?;
        functions.register_function(&function.name, function.params.clone(), body)?;
    }

    let mut graph = CircuitGraph::new();
    let mut scope = Scope::default();
    for statement in &ast.statements {
        lower(&mut graph, &functions, &mut scope, statement, true)?;
    }
    for mark in &ast.outputs {
        let name = scope.resolve(&mark.name, mark.line)?;
        graph.mark_output(&name)?;
    }
    validate_graph(&graph)?;

    info!(
        nodes = graph.len(),
        inputs = graph.inputs().len(),
        outputs = graph.outputs().len(),
        functions = functions.len(),
        "built circuit"
    );
    Ok(BuiltCircuit {
        graph,
        params,
        functions,
    })
}

fn build_body(function: &FunctionAst, functions: &FunctionTable) -> Result<CircuitGraph> {
    let mut body = CircuitGraph::new();
    let mut scope = Scope::default();
    for param in &function.params {
        body.add_input(param, None)?;
        scope.bind(param, param.clone(), function.line)?;
    }
    for statement in &function.body {
        lower(&mut body, functions, &mut scope, statement, false)?;
    }
    if function.returns.is_empty() {
        return Err(LevelerError::parse(
            function.line,
            format!("function '{}' has no .return", function.name),
        ));
    }
    for name in &function.returns {
        let node = scope.resolve(name, function.line)?;
        body.mark_output(&node)?;
    }
    debug!(function = %function.name, nodes = body.len(), "built function body");
    Ok(body)
}

/// Add the nodes for one statement to `graph`.
fn lower(
    graph: &mut CircuitGraph,
    functions: &FunctionTable,
    scope: &mut Scope,
    statement: &Statement,
    top_level: bool,
) -> Result<()> {
    let line = statement.line;
    let level = statement.level.map(Depth);

    match statement.op.as_str() {
        "input" | "output" if !top_level => Err(LevelerError::parse(
            line,
            format!("'{}' is not allowed inside a function", statement.op),
        )),
        "input" => {
            let target = single_target(statement)?;
            if !statement.args.is_empty() {
                return Err(LevelerError::arity("input", 0, statement.args.len()));
            }
            scope.bind(target, target.to_string(), line)?;
            graph.add_input(target, level)?;
            Ok(())
        }
        "output" => {
            let target = single_target(statement)?;
            if statement.args.len() != 1 {
                return Err(LevelerError::arity("output", 1, statement.args.len()));
            }
            let source = scope.resolve(&statement.args[0], line)?;
            scope.bind(target, target.to_string(), line)?;
            graph.add_output(target, &source, level)?;
            Ok(())
        }
        op => {
            if level.is_some() {
                return Err(LevelerError::parse(
                    line,
                    "levels can only be given for inputs and outputs",
                ));
            }
            let args = statement
                .args
                .iter()
                .map(|a| scope.resolve(a, line))
                .collect::<Result<Vec<_>>>()?;

            match functions.get(op) {
                Some(FunctionDef::UserDefined { body, .. }) => {
                    if statement.targets.len() != body.outputs().len() {
                        return Err(LevelerError::parse(
                            line,
                            format!(
                                "'{}' returns {} value(s), {} name(s) given",
                                op,
                                body.outputs().len(),
                                statement.targets.len()
                            ),
                        ));
                    }
                    for target in &statement.targets {
                        scope.check_unbound(target, line)?;
                    }
                    let results = functions.inline_call(graph, op, &args, &statement.targets[0])?;
                    for (target, result) in statement.targets.iter().zip(results) {
                        scope.bind(target, result, line)?;
                    }
                    Ok(())
                }
                builtin => {
                    let target = single_target(statement)?;
                    let keyword = match builtin {
                        Some(FunctionDef::Builtin { kind, .. }) => kind.keyword(),
                        _ => op,
                    };
                    scope.check_unbound(target, line)?;
                    let operands: Vec<&str> = args.iter().map(String::as_str).collect();
                    graph.insert_op(keyword, &operands, Some(target))?;
                    scope.bind(target, target.to_string(), line)?;
                    Ok(())
                }
            }
        }
    }
}

fn single_target(statement: &Statement) -> Result<&str> {
    match statement.targets.as_slice() {
        [target] => Ok(target),
        _ => Err(LevelerError::parse(
            statement.line,
            format!("'{}' binds exactly one name", statement.op),
        )),
    }
}

/// Source identifiers bound to graph node names.
#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, String>,
}

impl Scope {
    fn check_unbound(&self, name: &str, line: usize) -> Result<()> {
        if self.symbols.contains_key(name) {
            return Err(LevelerError::parse(line, format!("'{}' is already defined", name)));
        }
        Ok(())
    }

    fn bind(&mut self, name: &str, node: String, line: usize) -> Result<()> {
        self.check_unbound(name, line)?;
        self.symbols.insert(name.to_string(), node);
        Ok(())
    }

    fn resolve(&self, name: &str, line: usize) -> Result<String> {
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| LevelerError::parse(line, format!("undefined name '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::NodeKind;
    use crate::dsl;

    fn build(src: &str) -> Result<BuiltCircuit> {
        build_circuit(&dsl::parse(src)?)
    }

    #[test]
    fn test_build_simple() {
        let built = build("x = input @2\nm = mul x x\no = output m @2").unwrap();
        let g = &built.graph;
        assert_eq!(g.len(), 3);
        assert_eq!(g.get("m").unwrap().kind, NodeKind::Multiply);
        assert_eq!(g.get("x").unwrap().output_depth, Some(Depth(2)));
        assert!(g.get("x").unwrap().pinned);
        assert_eq!(g.outputs(), &["o".to_string()]);
    }

    #[test]
    fn test_build_inlines_functions() {
        let src = "\
.param plaintext_modulus 17
.func square a
  t = mul a a
  .return t
.end
x = input @3
y = input @3
s = add x y
q = square s
o = output q @1
";
        let built = build(src).unwrap();
        assert_eq!(built.params.get("plaintext_modulus"), Some(17));
        assert_eq!(built.functions.arity_of("square"), Some(1));
        let g = &built.graph;
        assert_eq!(g.get("q/t").unwrap().operands, vec!["s", "s"]);
        assert_eq!(g.get("o").unwrap().operands, vec!["q/t"]);
        assert!(!g.contains("q"));
    }

    #[test]
    fn test_build_aliases_and_custom_builtins() {
        let mut table = FunctionTable::with_builtins();
        table.register_builtin("times", NodeKind::Multiply).unwrap();
        let ast = dsl::parse("x = input\na = times x x\nb = negate a\n.output b").unwrap();
        let built = build_with(&ast, table).unwrap();
        assert_eq!(built.graph.get("a").unwrap().kind, NodeKind::Multiply);
        assert_eq!(built.graph.get("b").unwrap().kind, NodeKind::Negate);
        assert!(built.graph.get("b").unwrap().is_output);
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(
            build("x = input\ny = rotate x").unwrap_err(),
            LevelerError::UnknownOperation { .. }
        ));
        assert!(matches!(
            build("x = input\ny = add x z").unwrap_err(),
            LevelerError::ParseError { line: 2, .. }
        ));
        assert!(matches!(
            build("x = input\nx = neg x").unwrap_err(),
            LevelerError::ParseError { .. }
        ));
        assert!(matches!(
            build("x = input\ny = add x").unwrap_err(),
            LevelerError::ArityMismatch { .. }
        ));
        assert!(matches!(
            build("x = input\ny = neg x @2").unwrap_err(),
            LevelerError::ParseError { .. }
        ));
    }

    #[test]
    fn test_call_arity_mismatch() {
        let src = "\
.func mac a b
  p = mul a b
  s = add p a
  .return s
.end
x = input
y = input
z = input
r = mac x y z
";
        let err = build(src).unwrap_err();
        assert!(matches!(
            err,
            LevelerError::ArityMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }
}
