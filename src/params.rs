//! Named parameter store shared by circuit builders and evaluators.
//!
//! Holds scheme parameters such as the ring dimension or the plaintext
//! modulus. The balancer never reads it.

use std::collections::BTreeMap;

use crate::error::{LevelerError, Result};

/// Ring dimension parameter name.
pub const RING_DIMENSION: &str = "ring_dimension";

/// Plaintext modulus parameter name.
pub const PLAINTEXT_MODULUS: &str = "plaintext_modulus";

/// Named integer parameters, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamContext {
    values: BTreeMap<String, u64>,
}

impl ParamContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: u64) -> Option<u64> {
        self.values.insert(name.into(), value)
    }

    /// Get a parameter.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Get a parameter or a default.
    pub fn get_or(&self, name: &str, default: u64) -> u64 {
        self.get(name).unwrap_or(default)
    }

    /// Get a parameter that must be present.
    pub fn require(&self, name: &str) -> Result<u64> {
        self.get(name).ok_or_else(|| LevelerError::MissingParameter {
            name: name.to_string(),
        })
    }

    /// Iterate over all parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_require() {
        let mut params = ParamContext::new();
        assert_eq!(params.set(PLAINTEXT_MODULUS, 17), None);
        assert_eq!(params.set(PLAINTEXT_MODULUS, 65537), Some(17));
        assert_eq!(params.require(PLAINTEXT_MODULUS).unwrap(), 65537);
        assert_eq!(params.get_or(RING_DIMENSION, 1024), 1024);
        assert!(matches!(
            params.require(RING_DIMENSION).unwrap_err(),
            LevelerError::MissingParameter { .. }
        ));
    }
}
