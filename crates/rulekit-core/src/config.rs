//! Module configuration map with typed decoding
//!
//! Configuration arrives as an untyped map of parameter names to JSON values.
//! Handlers decode it into their own config structs at construction time, so
//! malformed configuration surfaces as a [`ConfigError`] once instead of as
//! unchecked casts during evaluation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid module configuration: {0}")]
    Invalid(String),
}

/// Configuration map for a single module
///
/// Key insertion order is irrelevant. Values are arbitrary JSON; typed access
/// goes through [`Configuration::decode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(HashMap<String, serde_json::Value>);

impl Configuration {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a parameter value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a raw parameter value
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Decode the map into a typed per-module config struct
    ///
    /// Missing required keys and wrong-typed values both fail the decode.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let value = serde_json::to_value(&self.0)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the configuration carries no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
