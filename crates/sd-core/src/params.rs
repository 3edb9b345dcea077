//! System-scoped named parameters that entity parameters may reference.

use crate::model::ParameterValue;
use std::collections::HashMap;

/// Lookup contract for named parameters.
pub trait ParameterStore {
    fn has_named_parameter(&self, key: &str) -> bool;
    fn resolve(&self, key: &str) -> Option<f64>;
}

/// Named system parameters of one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemParameters {
    values: HashMap<String, f64>,
}

impl SystemParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named parameter, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<f64> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Evaluate parameter text: a literal, or a reference resolved here.
    pub fn evaluate(&self, text: &str) -> Option<f64> {
        match ParameterValue::parse(text) {
            ParameterValue::Literal(v) => Some(v),
            ParameterValue::Reference(key) => self.resolve(key),
        }
    }
}

impl ParameterStore for SystemParameters {
    fn has_named_parameter(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn resolve(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_literals_and_references() {
        let mut params = SystemParameters::new();
        params.set("p_supply", 2e7);

        assert_eq!(params.evaluate("3.5"), Some(3.5));
        assert_eq!(params.evaluate("p_supply"), Some(2e7));
        assert_eq!(params.evaluate("p_missing"), None);
        assert!(params.has_named_parameter("p_supply"));
    }
}
