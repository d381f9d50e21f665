//! Core types for circuit representation.

use std::fmt;

/// A ciphertext level (multiplicative depth budget).
///
/// Larger values are less reduced. The balancer only compares levels and
/// never does arithmetic on them, so the encoding is up to the numeric
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Depth(pub u32);

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Depth {
    fn from(level: u32) -> Self {
        Depth(level)
    }
}

/// The closed set of homomorphic operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Encrypted circuit input
    Input,
    /// Designated circuit result
    Output,
    /// Homomorphic addition
    Add,
    /// Homomorphic multiplication
    Multiply,
    /// Homomorphic negation
    Negate,
    /// Explicit level reduction (ModReduce), only inserted by the balancer
    LevelReduce,
}

impl NodeKind {
    /// Parse a node kind from its DSL keyword.
    ///
    /// `LevelReduce` has no keyword: user circuits never request it.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            "add" => Some(Self::Add),
            "mul" | "multiply" => Some(Self::Multiply),
            "neg" | "negate" => Some(Self::Negate),
            _ => None,
        }
    }

    /// Canonical keyword, also used as the node's rendering decoration.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Add => "add",
            Self::Multiply => "mul",
            Self::Negate => "neg",
            Self::LevelReduce => "modreduce",
        }
    }

    /// Get the number of operands this kind takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::Input => 0,
            Self::Output | Self::Negate | Self::LevelReduce => 1,
            Self::Add | Self::Multiply => 2,
        }
    }

    /// Prefix for auto-generated node names.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
            Self::Add => "add",
            Self::Multiply => "mul",
            Self::Negate => "neg",
            Self::LevelReduce => "lr",
        }
    }

    /// Level each operand must present, given the level this node produces.
    ///
    /// Returns `None` for `LevelReduce`, whose input level is stored on the
    /// node rather than derived, and for `Input`, which has no operands.
    pub fn transfer(&self, output: Depth) -> Option<Depth> {
        match self {
            Self::Output | Self::Add | Self::Multiply | Self::Negate => Some(output),
            Self::Input | Self::LevelReduce => None,
        }
    }

    /// Whether the balancer may rewrite this node's levels in place.
    pub fn is_reduction(&self) -> bool {
        matches!(self, Self::LevelReduce)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_round_trip() {
        for kind in [
            NodeKind::Input,
            NodeKind::Output,
            NodeKind::Add,
            NodeKind::Multiply,
            NodeKind::Negate,
        ] {
            assert_eq!(NodeKind::from_keyword(kind.keyword()), Some(kind));
        }
    }

    #[test]
    fn test_level_reduce_not_requestable() {
        assert_eq!(NodeKind::from_keyword("modreduce"), None);
        assert_eq!(NodeKind::from_keyword("sub"), None);
    }

    #[test]
    fn test_transfer_rules() {
        assert_eq!(NodeKind::Multiply.transfer(Depth(3)), Some(Depth(3)));
        assert_eq!(NodeKind::Output.transfer(Depth(0)), Some(Depth(0)));
        assert_eq!(NodeKind::LevelReduce.transfer(Depth(1)), None);
        assert_eq!(NodeKind::Input.arity(), 0);
        assert_eq!(NodeKind::LevelReduce.arity(), 1);
    }
}
