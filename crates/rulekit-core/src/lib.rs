//! Core model types for the rule module handler subsystem
//!
//! A rule is composed of declarative *modules*: triggers that start it and
//! conditions that gate it. Each module carries a type identifier and an
//! untyped configuration map; handlers give modules their runtime behavior.
//!
//! # Key Types
//!
//! - [`Module`] - A trigger or condition belonging to a rule
//! - [`Configuration`] - Per-module configuration map with typed decoding
//! - [`State`] - A typed item state value
//! - [`StateType`] - The set of state representations an item accepts

pub mod config;
pub mod module;
pub mod state;

pub use config::{ConfigError, Configuration};
pub use module::{Condition, Module, Trigger};
pub use state::{parse_state, State, StateType};
