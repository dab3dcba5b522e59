//! Handler contracts and shared runtime types
//!
//! A handler is the runtime object behind one module of one rule. Trigger
//! handlers hold a scheduler registration and push firings to the rule
//! engine; condition handlers are synchronous read-only predicates.

use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Inputs passed to condition evaluation by the rule engine
pub type Inputs = HashMap<String, serde_json::Value>;

/// Notification delivered to the rule engine when a trigger fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerFired {
    /// The rule the firing trigger belongs to
    pub rule_id: String,

    /// The trigger module within the rule
    pub module_id: String,

    /// When the trigger fired
    pub fired_at: DateTime<Utc>,
}

/// A trigger module's runtime handler
///
/// Created registered: by the time the factory hands the handler out, its
/// scheduler registration is active.
pub trait TriggerHandler: Send + Sync {
    /// Deregister from the scheduler
    ///
    /// Safe to call concurrently with an in-flight fire and idempotent. After
    /// `dispose` returns no new firing reaches the rule engine; a callback
    /// already dispatched may still complete.
    fn dispose(&self);
}

/// A condition module's runtime handler
///
/// Evaluation reads current state only and is safe to call from any thread.
pub trait ConditionHandler: Send + Sync {
    /// Whether the condition currently holds
    ///
    /// Never panics; every failure path resolves to `false`.
    fn is_satisfied(&self, inputs: &Inputs) -> bool;
}

/// A handler of either module category
pub enum ModuleHandler {
    Trigger(Box<dyn TriggerHandler>),
    Condition(Box<dyn ConditionHandler>),
}

impl ModuleHandler {
    /// Whether this is a trigger handler
    pub fn is_trigger(&self) -> bool {
        matches!(self, ModuleHandler::Trigger(_))
    }

    /// Whether this is a condition handler
    pub fn is_condition(&self) -> bool {
        matches!(self, ModuleHandler::Condition(_))
    }

    /// The condition capability, for condition handlers
    pub fn as_condition(&self) -> Option<&dyn ConditionHandler> {
        match self {
            ModuleHandler::Condition(c) => Some(c.as_ref()),
            ModuleHandler::Trigger(_) => None,
        }
    }

    /// Dispose the handler
    ///
    /// Deregisters trigger handlers from the scheduler; a no-op for
    /// conditions, which hold no registrations.
    pub fn dispose(&self) {
        if let ModuleHandler::Trigger(t) = self {
            t.dispose();
        }
    }
}

/// Wall-clock source with an optional fixed override
///
/// Handlers that depend on the time of day read through a `Clock` so tests
/// can pin or advance "now" without waiting. Clones share the override.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    override_time: Arc<Mutex<Option<DateTime<Local>>>>,
}

impl Clock {
    /// Create a clock that follows the system time
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock pinned to a fixed instant
    pub fn fixed(time: DateTime<Local>) -> Self {
        let clock = Self::new();
        clock.set(time);
        clock
    }

    /// Pin the clock to an instant
    pub fn set(&self, time: DateTime<Local>) {
        let mut guard = self.override_time.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(time);
    }

    /// Return to following the system time
    pub fn clear(&self) {
        let mut guard = self.override_time.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    /// Current time, or the pinned override
    pub fn now(&self) -> DateTime<Local> {
        let guard = self.override_time.lock().unwrap_or_else(|e| e.into_inner());
        guard.unwrap_or_else(Local::now)
    }
}

/// Parse a time-of-day literal, `HH:MM:SS` or `HH:MM`
pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        return Some(t);
    }

    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
        return Some(t);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(parse_time("07:00"), NaiveTime::from_hms_opt(7, 0, 0));
        assert_eq!(parse_time("07:00:30"), NaiveTime::from_hms_opt(7, 0, 30));
        assert_eq!(parse_time("7 o'clock"), None);
        assert_eq!(parse_time("25:00"), None);
    }

    #[test]
    fn test_clock_override_shared_between_clones() {
        let clock = Clock::new();
        let other = clock.clone();

        let pinned = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        clock.set(pinned);
        assert_eq!(other.now(), pinned);

        clock.clear();
        assert_ne!(other.now(), pinned);
    }
}
