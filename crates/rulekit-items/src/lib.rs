//! In-memory item registry
//!
//! The registry tracks every item the rule engine can reference: its name,
//! its current typed state, and the set of state representations it accepts
//! (used to parse literal configuration strings into comparable states).
//! Condition handlers share it read-only behind an `Arc`; its internal map
//! provides the concurrency guarantees, callers take no locks.

use dashmap::DashMap;
use rulekit_core::{State, StateType};
use std::sync::Arc;
use tracing::{debug, trace};

/// An item known to the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Unique item name
    pub name: String,

    /// Current state
    pub state: State,

    /// State representations accepted when parsing literals for this item
    pub accepted_types: Vec<StateType>,
}

impl Item {
    /// Create a new item
    pub fn new(
        name: impl Into<String>,
        state: impl Into<State>,
        accepted_types: Vec<StateType>,
    ) -> Self {
        Self {
            name: name.into(),
            state: state.into(),
            accepted_types,
        }
    }

    /// The item's current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The state types accepted when parsing literals for this item
    pub fn accepted_types(&self) -> &[StateType] {
        &self.accepted_types
    }
}

/// Registry of all items, keyed by name
pub struct ItemRegistry {
    items: DashMap<String, Item>,
}

impl ItemRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Add or replace an item
    pub fn add(&self, item: Item) {
        debug!(name = %item.name, state = %item.state, "Adding item");
        self.items.insert(item.name.clone(), item);
    }

    /// Look up an item by name
    pub fn get(&self, name: &str) -> Option<Item> {
        self.items.get(name).map(|i| i.clone())
    }

    /// Update an item's current state
    ///
    /// Returns `false` when the item is unknown.
    pub fn set_state(&self, name: &str, state: State) -> bool {
        match self.items.get_mut(name) {
            Some(mut item) => {
                trace!(name, state = %state, "Updating item state");
                item.state = state;
                true
            }
            None => false,
        }
    }

    /// Remove an item
    pub fn remove(&self, name: &str) -> Option<Item> {
        self.items.remove(name).map(|(_, item)| item)
    }

    /// Number of registered items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared registry handle
pub type SharedItemRegistry = Arc<ItemRegistry>;
