//! Abstract Syntax Tree types for the circuit DSL.

/// Complete AST representation of a parsed circuit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitAst {
    /// `.param` definitions, in source order
    pub params: Vec<ParamDef>,
    /// `.func` definitions, in source order
    pub functions: Vec<FunctionAst>,
    /// Top-level statements
    pub statements: Vec<Statement>,
    /// Names flagged with `.output`
    pub outputs: Vec<OutputMark>,
}

impl CircuitAst {
    /// Create a new empty circuit AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A named integer parameter (`.param <name> <value>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub value: u64,
    /// Source line number
    pub line: usize,
}

/// A user-defined function (`.func` ... `.end`).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionAst {
    /// Function name
    pub name: String,
    /// Formal parameter names
    pub params: Vec<String>,
    /// Body statements
    pub body: Vec<Statement>,
    /// Names listed by `.return`
    pub returns: Vec<String>,
    /// Source line of the `.func` directive
    pub line: usize,
}

/// One assignment: `target+ = op arg* [@level]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Names bound by this statement (several for multi-result calls)
    pub targets: Vec<String>,
    /// Operation keyword or function name
    pub op: String,
    /// Argument names
    pub args: Vec<String>,
    /// Level annotation (base level of an input, target of an output)
    pub level: Option<u32>,
    /// Source line number for error reporting
    pub line: usize,
}

/// A `.output <name>` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMark {
    pub name: String,
    /// Source line number
    pub line: usize,
}
