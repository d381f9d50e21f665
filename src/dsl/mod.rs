//! DSL (Domain Specific Language) parser for homomorphic circuit descriptions.
//!
//! The DSL is line-oriented and human-editable: every line declares one
//! node, defines a parameter, or opens/closes a function definition.
//!
//! # Grammar Overview
//!
//! ```text
//! circuit     = { line }
//! line        = comment | directive | statement | function | empty
//! comment     = ('#' | ';') { any_char }
//! directive   = ".param" identifier number
//!             | ".output" identifier
//! function    = ".func" identifier { identifier } newline
//!               { statement | ".return" identifier { identifier } }
//!               ".end"
//! statement   = identifier { identifier } '=' op { identifier } [ '@' number ]
//! op          = "input" | "output" | "add" | "mul" | "neg" | identifier
//!
//! number      = digit { digit }
//! identifier  = (letter | '_') { letter | digit | '_' }
//! ```
//!
//! # Operations
//!
//! | Op | Description | Syntax |
//! |----|-------------|--------|
//! | input | Encrypted input, optionally at a base level | `x = input [@level]` |
//! | output | Circuit result at a target level | `o = output <node> @level` |
//! | add | Homomorphic addition | `s = add <a> <b>` |
//! | mul | Homomorphic multiplication | `m = mul <a> <b>` |
//! | neg | Homomorphic negation | `n = neg <a>` |
//! | *function* | Inline a user function | `r1 [r2 ...] = <func> <args>` |
//!
//! Level reductions cannot be written: the balancer inserts them.
//!
//! # Example
//!
//! ```text
//! # (x + y)^2 reduced to level 1
//! .param plaintext_modulus 65537
//!
//! .func square a
//!   t = mul a a
//!   .return t
//! .end
//!
//! x = input @3
//! y = input @3
//! s = add x y
//! q = square s
//! o = output q @1
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a circuit DSL string into an AST.
pub fn parse(input: &str) -> Result<CircuitAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer);
    parser.parse()
}

/// Parse a circuit DSL file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<CircuitAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::LevelerError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
