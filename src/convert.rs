//! Conversion registry
//!
//! Spec entries name the conversion that turns their raw fields into
//! human-readable values. The formulas themselves live outside this crate;
//! callers register them by name and the decoder invokes them through the
//! [`Conversions`] trait.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use crate::error::{Error, Result};
use crate::field::Value;

/// Raw field values of one sub-packet, keyed by field name
pub type RawFields = BTreeMap<String, Value>;

/// Converted values keyed by field name
pub type ConvertedFields = BTreeMap<String, Converted>;

/// A human-readable value and its unit
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    /// Converted value
    pub hrf: Value,
    /// Unit of `hrf`
    pub unit: String,
}

impl Converted {
    /// Create a converted value
    #[inline]
    pub fn new(hrf: Value, unit: impl Into<String>) -> Self {
        Self {
            hrf,
            unit: unit.into(),
        }
    }
}

/// A conversion callable; `None` when the raw inputs cannot be converted
pub type ConversionFn = fn(&RawFields) -> Option<ConvertedFields>;

/// Source of named conversions
pub trait Conversions {
    /// Apply the conversion called `name` to a sub-packet's raw fields
    ///
    /// Fails with [`Error::ConversionUnavailable`] when the conversion is
    /// unknown or cannot handle the inputs.
    fn convert(&self, name: &str, raw: &RawFields) -> Result<ConvertedFields>;
}

/// No conversions at all; every reading stays raw
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConversions;

impl Conversions for NoConversions {
    fn convert(&self, name: &str, _raw: &RawFields) -> Result<ConvertedFields> {
        Err(Error::ConversionUnavailable(name.to_string()))
    }
}

/// Static map from conversion name to function, built once at startup
#[derive(Debug, Clone, Default)]
pub struct ConversionRegistry {
    functions: BTreeMap<&'static str, ConversionFn>,
}

impl ConversionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, returning the one it replaces
    pub fn register(&mut self, name: &'static str, function: ConversionFn) -> Option<ConversionFn> {
        self.functions.insert(name, function)
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, name: &'static str, function: ConversionFn) -> Self {
        self.register(name, function);
        self
    }

    /// Check if a conversion is registered
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered conversions
    #[inline]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if nothing is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Conversions for ConversionRegistry {
    fn convert(&self, name: &str, raw: &RawFields) -> Result<ConvertedFields> {
        self.functions
            .get(name)
            .and_then(|function| function(raw))
            .ok_or_else(|| Error::ConversionUnavailable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celsius(raw: &RawFields) -> Option<ConvertedFields> {
        let counts = raw.get("temperature")?.as_f64()?;
        let mut out = ConvertedFields::new();
        out.insert(
            "temperature".to_string(),
            Converted::new(Value::Float(counts / 16.0), "C"),
        );
        Some(out)
    }

    fn raw_with(name: &str, value: Value) -> RawFields {
        let mut raw = RawFields::new();
        raw.insert(name.to_string(), value);
        raw
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ConversionRegistry::new().with("tmp112", celsius);
        assert!(registry.contains("tmp112"));
        assert_eq!(registry.len(), 1);

        let out = registry
            .convert("tmp112", &raw_with("temperature", Value::Signed(400)))
            .unwrap();
        assert_eq!(out["temperature"], Converted::new(Value::Float(25.0), "C"));
    }

    #[test]
    fn test_missing_conversion() {
        let registry = ConversionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.convert("tmp112", &RawFields::new()),
            Err(Error::ConversionUnavailable("tmp112".to_string()))
        );
        assert_eq!(
            NoConversions.convert("x", &RawFields::new()),
            Err(Error::ConversionUnavailable("x".to_string()))
        );
    }

    #[test]
    fn test_unconvertible_inputs() {
        let registry = ConversionRegistry::new().with("tmp112", celsius);
        assert!(registry
            .convert("tmp112", &raw_with("humidity", Value::Unsigned(1)))
            .is_err());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ConversionRegistry::new();
        assert!(registry.register("a", celsius).is_none());
        assert!(registry.register("a", celsius).is_some());
    }
}
