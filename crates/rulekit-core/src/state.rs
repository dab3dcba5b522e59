//! Typed item state values
//!
//! An item's state is one of a small closed set of representations. Literal
//! configuration strings are parsed against the item's accepted types, first
//! accepted type that parses wins.

use serde::{Deserialize, Serialize};

/// A typed state value
///
/// Equality is structural and never crosses variants: `Decimal(21.0)` does
/// not equal `Str("21")`. Ordering semantics exist only for decimal states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum State {
    /// Numeric state with decimal ordering
    Decimal(f64),

    /// Binary on/off state
    OnOff(bool),

    /// Free-form string state
    Str(String),
}

impl State {
    /// The decimal value, for states that carry numeric semantics
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            State::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Decimal(d) => write!(f, "{}", d),
            State::OnOff(true) => write!(f, "ON"),
            State::OnOff(false) => write!(f, "OFF"),
            State::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for State {
    fn from(d: f64) -> Self {
        State::Decimal(d)
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        State::Str(s.to_string())
    }
}

/// A state representation an item accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    Decimal,
    OnOff,
    Str,
}

impl StateType {
    /// Parse a literal into this representation
    pub fn parse(&self, literal: &str) -> Option<State> {
        match self {
            StateType::Decimal => literal.trim().parse::<f64>().ok().map(State::Decimal),
            StateType::OnOff => match literal.trim().to_ascii_uppercase().as_str() {
                "ON" => Some(State::OnOff(true)),
                "OFF" => Some(State::OnOff(false)),
                _ => None,
            },
            StateType::Str => Some(State::Str(literal.to_string())),
        }
    }
}

/// Parse a literal against a list of accepted state types
///
/// Returns the first accepted type that parses the literal, or `None` when
/// nothing does.
pub fn parse_state(accepted: &[StateType], literal: &str) -> Option<State> {
    accepted.iter().find_map(|t| t.parse(literal))
}
