//! Condition handlers
//!
//! Conditions are stateless predicates the rule engine evaluates
//! synchronously. They read current state only and absorb every failure:
//! misconfiguration, unknown items, and unparseable literals all log and
//! resolve to "not satisfied", never an error crossing the handler boundary.

use chrono::{Datelike, Weekday};
use rulekit_core::{parse_state, Condition, State};
use rulekit_items::SharedItemRegistry;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::handler::{parse_time, Clock, ConditionHandler, Inputs};

/// Type identifier of the item-state comparison condition
pub const ITEM_STATE_CONDITION: &str = "core.ItemStateCondition";

/// Type identifier of the time-window condition
pub const TIME_OF_DAY_CONDITION: &str = "timer.TimeOfDayCondition";

/// Type identifier of the weekday condition
pub const DAY_OF_WEEK_CONDITION: &str = "timer.DayOfWeekCondition";

// --- Item state condition ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemStateConfig {
    item_name: String,
    operator: String,
    state: String,
}

/// Comparison operators on item states
///
/// Ordering operators are defined only when both operands carry decimal
/// semantics; everywhere else they simply never satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Neq),
            "<" => Some(CompareOp::Lt),
            "<=" | "=<" => Some(CompareOp::Lte),
            ">" => Some(CompareOp::Gt),
            ">=" | "=>" => Some(CompareOp::Gte),
            _ => None,
        }
    }
}

/// Condition comparing an item's current state against a configured literal
pub struct ItemStateConditionHandler {
    module_id: String,
    config: Option<ItemStateConfig>,
    items: SharedItemRegistry,
}

impl ItemStateConditionHandler {
    /// Create the handler
    ///
    /// Missing or malformed configuration is recorded here; the handler is
    /// still returned, it just never satisfies.
    pub fn new(condition: &Condition, items: SharedItemRegistry) -> Self {
        let config = match condition.configuration.decode::<ItemStateConfig>() {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(
                    module_id = %condition.id,
                    error = %e,
                    "Item state condition is not well configured"
                );
                None
            }
        };

        Self {
            module_id: condition.id.clone(),
            config,
            items,
        }
    }

    fn compare(op: CompareOp, current: &State, target: &State) -> bool {
        match op {
            CompareOp::Eq => current == target,
            CompareOp::Neq => current != target,
            CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
                match (current.as_decimal(), target.as_decimal()) {
                    (Some(current), Some(target)) => match op {
                        CompareOp::Lt => current < target,
                        CompareOp::Lte => current <= target,
                        CompareOp::Gt => current > target,
                        CompareOp::Gte => current >= target,
                        _ => unreachable!(),
                    },
                    // Ordering is undefined outside decimal states.
                    _ => false,
                }
            }
        }
    }
}

impl ConditionHandler for ItemStateConditionHandler {
    fn is_satisfied(&self, _inputs: &Inputs) -> bool {
        let Some(config) = &self.config else {
            return false;
        };

        let Some(item) = self.items.get(&config.item_name) else {
            warn!(
                module_id = %self.module_id,
                item_name = %config.item_name,
                "Item not found in registry"
            );
            return false;
        };

        let Some(op) = CompareOp::parse(&config.operator) else {
            debug!(
                module_id = %self.module_id,
                operator = %config.operator,
                "Unknown comparison operator"
            );
            return false;
        };

        let Some(target) = parse_state(item.accepted_types(), &config.state) else {
            debug!(
                module_id = %self.module_id,
                literal = %config.state,
                "State literal not parseable for item"
            );
            return false;
        };

        let satisfied = Self::compare(op, item.state(), &target);
        debug!(
            module_id = %self.module_id,
            item_name = %config.item_name,
            current = %item.state(),
            operator = %config.operator,
            target = %target,
            satisfied,
            "Checked item state condition"
        );
        satisfied
    }
}

// --- Time-of-day condition ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeOfDayConfig {
    start_time: String,
    end_time: String,
}

/// Condition satisfied while the current time lies in a daily window
///
/// Windows whose end precedes their start wrap past midnight.
pub struct TimeOfDayConditionHandler {
    module_id: String,
    window: Option<(chrono::NaiveTime, chrono::NaiveTime)>,
    clock: Clock,
}

impl TimeOfDayConditionHandler {
    /// Create the handler; misconfiguration makes it never satisfy
    pub fn new(condition: &Condition, clock: Clock) -> Self {
        let window = match condition.configuration.decode::<TimeOfDayConfig>() {
            Ok(config) => {
                match (parse_time(&config.start_time), parse_time(&config.end_time)) {
                    (Some(start), Some(end)) => Some((start, end)),
                    _ => {
                        warn!(
                            module_id = %condition.id,
                            start = %config.start_time,
                            end = %config.end_time,
                            "Time window literals are not parseable"
                        );
                        None
                    }
                }
            }
            Err(e) => {
                warn!(
                    module_id = %condition.id,
                    error = %e,
                    "Time-of-day condition is not well configured"
                );
                None
            }
        };

        Self {
            module_id: condition.id.clone(),
            window,
            clock,
        }
    }
}

impl ConditionHandler for TimeOfDayConditionHandler {
    fn is_satisfied(&self, _inputs: &Inputs) -> bool {
        let Some((start, end)) = self.window else {
            return false;
        };

        let now = self.clock.now().time();
        let satisfied = if start <= end {
            start <= now && now < end
        } else {
            // Window wraps past midnight.
            now >= start || now < end
        };

        debug!(
            module_id = %self.module_id,
            %now,
            %start,
            %end,
            satisfied,
            "Checked time-of-day condition"
        );
        satisfied
    }
}

// --- Day-of-week condition ---

#[derive(Debug, Deserialize)]
struct DayOfWeekConfig {
    days: Vec<String>,
}

/// Condition satisfied on configured weekdays
pub struct DayOfWeekConditionHandler {
    module_id: String,
    days: Option<Vec<Weekday>>,
    clock: Clock,
}

impl DayOfWeekConditionHandler {
    /// Create the handler; misconfiguration makes it never satisfy
    pub fn new(condition: &Condition, clock: Clock) -> Self {
        let days = match condition.configuration.decode::<DayOfWeekConfig>() {
            Ok(config) => {
                let parsed: Option<Vec<Weekday>> =
                    config.days.iter().map(|d| parse_weekday(d)).collect();
                if parsed.is_none() {
                    warn!(
                        module_id = %condition.id,
                        days = ?config.days,
                        "Unknown weekday literal"
                    );
                }
                parsed
            }
            Err(e) => {
                warn!(
                    module_id = %condition.id,
                    error = %e,
                    "Day-of-week condition is not well configured"
                );
                None
            }
        };

        Self {
            module_id: condition.id.clone(),
            days,
            clock,
        }
    }
}

impl ConditionHandler for DayOfWeekConditionHandler {
    fn is_satisfied(&self, _inputs: &Inputs) -> bool {
        let Some(days) = &self.days else {
            return false;
        };

        let today = self.clock.now().weekday();
        let satisfied = days.contains(&today);
        debug!(
            module_id = %self.module_id,
            ?today,
            satisfied,
            "Checked day-of-week condition"
        );
        satisfied
    }
}

/// Parse a weekday literal, case-insensitive, three-letter or full name
fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
