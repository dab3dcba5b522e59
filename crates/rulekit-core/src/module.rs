//! Module types
//!
//! Modules are the declarative units of a rule. A trigger fires an event that
//! starts the rule; a condition is a synchronous boolean gate. Both carry a
//! type identifier naming their behavior and a configuration map.

use serde::{Deserialize, Serialize};

use crate::config::Configuration;

/// A trigger module: firing produces an event consumed by the rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Module ID, unique within its rule
    pub id: String,

    /// Type identifier naming the handler behavior
    pub type_uid: String,

    /// Module configuration
    #[serde(default)]
    pub configuration: Configuration,
}

impl Trigger {
    /// Create a new trigger module
    pub fn new(
        id: impl Into<String>,
        type_uid: impl Into<String>,
        configuration: Configuration,
    ) -> Self {
        Self {
            id: id.into(),
            type_uid: type_uid.into(),
            configuration,
        }
    }
}

/// A condition module: evaluated synchronously to a boolean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Module ID, unique within its rule
    pub id: String,

    /// Type identifier naming the handler behavior
    pub type_uid: String,

    /// Module configuration
    #[serde(default)]
    pub configuration: Configuration,
}

impl Condition {
    /// Create a new condition module
    pub fn new(
        id: impl Into<String>,
        type_uid: impl Into<String>,
        configuration: Configuration,
    ) -> Self {
        Self {
            id: id.into(),
            type_uid: type_uid.into(),
            configuration,
        }
    }
}

/// A rule module, either category
///
/// The two categories are a closed set: dispatch on a `Module` is an enum
/// match, not a runtime class check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Module {
    Trigger(Trigger),
    Condition(Condition),
}

impl Module {
    /// Module ID
    pub fn id(&self) -> &str {
        match self {
            Module::Trigger(t) => &t.id,
            Module::Condition(c) => &c.id,
        }
    }

    /// Type identifier
    pub fn type_uid(&self) -> &str {
        match self {
            Module::Trigger(t) => &t.type_uid,
            Module::Condition(c) => &c.type_uid,
        }
    }

    /// Module configuration
    pub fn configuration(&self) -> &Configuration {
        match self {
            Module::Trigger(t) => &t.configuration,
            Module::Condition(c) => &c.configuration,
        }
    }
}

impl From<Trigger> for Module {
    fn from(t: Trigger) -> Self {
        Module::Trigger(t)
    }
}

impl From<Condition> for Module {
    fn from(c: Condition) -> Self {
        Module::Condition(c)
    }
}
