//! Parser for the circuit DSL.

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{LevelerError, Result};

/// Parser for circuit DSL.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            current: Token {
                kind: TokenKind::Newline,
                text: String::new(),
                line: 1,
                column: 1,
            },
        }
    }

    /// Parse the entire circuit description.
    pub fn parse(&mut self) -> Result<CircuitAst> {
        let mut ast = CircuitAst::new();
        self.advance()?;

        while self.current.kind != TokenKind::Eof {
            // Skip empty lines
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
                continue;
            }

            match self.current.kind {
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let statement = self.parse_statement()?;
                    ast.statements.push(statement);
                }
                _ => {
                    return Err(LevelerError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            self.end_of_line()?;
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(LevelerError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    /// Consume the newline ending a line, or accept end of input.
    fn end_of_line(&mut self) -> Result<()> {
        match self.current.kind {
            TokenKind::Newline => self.advance(),
            TokenKind::Eof => Ok(()),
            _ => Err(LevelerError::parse(
                self.current.line,
                format!("unexpected {:?} at end of line", self.current.text),
            )),
        }
    }

    /// Identifiers up to the end of the line.
    fn identifiers(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        while self.current.kind == TokenKind::Identifier {
            names.push(self.current.text.clone());
            self.advance()?;
        }
        Ok(names)
    }

    fn parse_directive(&mut self, ast: &mut CircuitAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".param" => {
                let name = self.expect(TokenKind::Identifier)?.text;
                let value = self.expect(TokenKind::Number)?.text;
                let value = value
                    .parse::<u64>()
                    .map_err(|_| LevelerError::parse(line, format!("parameter value out of range: {}", value)))?;
                ast.params.push(ParamDef { name, value, line });
            }
            ".output" => {
                let name = self.expect(TokenKind::Identifier)?.text;
                ast.outputs.push(OutputMark { name, line });
            }
            ".func" => {
                let function = self.parse_function(line)?;
                if ast.functions.iter().any(|f| f.name == function.name) {
                    return Err(LevelerError::DuplicateFunction {
                        name: function.name,
                    });
                }
                ast.functions.push(function);
            }
            ".end" | ".return" => {
                return Err(LevelerError::parse(
                    line,
                    format!("{} outside of a function", directive),
                ));
            }
            _ => {
                return Err(LevelerError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    fn parse_function(&mut self, line: usize) -> Result<FunctionAst> {
        let name = self.expect(TokenKind::Identifier)?.text;
        let params = self.identifiers()?;
        self.end_of_line()?;

        let mut body = Vec::new();
        let mut returns = Vec::new();

        loop {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Eof => {
                    return Err(LevelerError::parse(
                        line,
                        format!("function '{}' is missing .end", name),
                    ));
                }
                TokenKind::Identifier => body.push(self.parse_statement()?),
                TokenKind::Directive => {
                    let directive = self.current.text.to_lowercase();
                    let directive_line = self.current.line;
                    self.advance()?;
                    match directive.as_str() {
                        ".return" => {
                            let names = self.identifiers()?;
                            if names.is_empty() {
                                return Err(LevelerError::parse(directive_line, ".return needs at least one name"));
                            }
                            returns.extend(names);
                        }
                        ".end" => break,
                        _ => {
                            return Err(LevelerError::parse(
                                directive_line,
                                format!("{} is not allowed inside a function", directive),
                            ));
                        }
                    }
                }
                _ => {
                    return Err(LevelerError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }
            self.end_of_line()?;
        }

        Ok(FunctionAst {
            name,
            params,
            body,
            returns,
            line,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let line = self.current.line;
        let targets = self.identifiers()?;
        self.expect(TokenKind::Equals)?;
        let op = self.expect(TokenKind::Identifier)?.text;
        let args = self.identifiers()?;

        let level = if self.current.kind == TokenKind::At {
            self.advance()?;
            let text = self.expect(TokenKind::Number)?.text;
            let level = text
                .parse::<u32>()
                .map_err(|_| LevelerError::parse(line, format!("level out of range: {}", text)))?;
            Some(level)
        } else {
            None
        };

        Ok(Statement {
            targets,
            op,
            args,
            level,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statement() {
        let ast = super::super::parse("m = mul x y").unwrap();
        assert_eq!(ast.statements.len(), 1);
        let stmt = &ast.statements[0];
        assert_eq!(stmt.targets, vec!["m"]);
        assert_eq!(stmt.op, "mul");
        assert_eq!(stmt.args, vec!["x", "y"]);
        assert_eq!(stmt.level, None);
    }

    #[test]
    fn test_parse_levels_and_params() {
        let input = ".param plaintext_modulus 17\nx = input @3\no = output x @1\n.output x";
        let ast = super::super::parse(input).unwrap();
        assert_eq!(ast.params[0].value, 17);
        assert_eq!(ast.statements[0].level, Some(3));
        assert_eq!(ast.statements[1].level, Some(1));
        assert_eq!(ast.outputs[0].name, "x");
        assert_eq!(ast.outputs[0].line, 4);
    }

    #[test]
    fn test_parse_function() {
        let input = "\
.func mac a b   # multiply-accumulate
  p = mul a b
  s = add p a
  .return s p
.end
";
        let ast = super::super::parse(input).unwrap();
        let f = &ast.functions[0];
        assert_eq!(f.name, "mac");
        assert_eq!(f.params, vec!["a", "b"]);
        assert_eq!(f.body.len(), 2);
        assert_eq!(f.returns, vec!["s", "p"]);
        assert!(ast.statements.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            super::super::parse(".func f a\n t = neg a\n").unwrap_err(),
            LevelerError::ParseError { line: 1, .. }
        ));
        assert!(matches!(
            super::super::parse(".return x").unwrap_err(),
            LevelerError::ParseError { .. }
        ));
        assert!(matches!(
            super::super::parse("x = input @").unwrap_err(),
            LevelerError::ParseError { .. }
        ));
        assert!(matches!(
            super::super::parse("m mul x").unwrap_err(),
            LevelerError::ParseError { .. }
        ));
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let input = ".func f a\n.return a\n.end\n.func f b\n.return b\n.end";
        assert!(matches!(
            super::super::parse(input).unwrap_err(),
            LevelerError::DuplicateFunction { .. }
        ));
    }
}
