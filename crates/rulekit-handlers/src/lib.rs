//! Rule module handlers
//!
//! This crate turns declarative rule modules into live handler objects.
//! The rule engine asks the [`ModuleHandlerFactory`] for a handler per
//! module; trigger handlers arm scheduler registrations and push
//! [`TriggerFired`] notifications back, condition handlers answer
//! [`ConditionHandler::is_satisfied`] synchronously.
//!
//! # Architecture
//!
//! ```text
//! RULE ENGINE -> FACTORY -> { TRIGGER HANDLER -> scheduler -> fired event
//!                           { CONDITION HANDLER -> item registry / clock
//! ```
//!
//! # Key Types
//!
//! - [`ModuleHandlerFactory`] - Type-identifier dispatch to handlers
//! - [`ModuleHandler`] - A created handler of either category
//! - [`TriggerHandler`] / [`ConditionHandler`] - The two handler capabilities
//! - [`Clock`] - Injectable wall-clock for time-based handlers

pub mod condition_handlers;
pub mod factory;
pub mod handler;
pub mod trigger_handlers;

#[cfg(test)]
pub(crate) mod testing;

pub use condition_handlers::{
    DayOfWeekConditionHandler, ItemStateConditionHandler, TimeOfDayConditionHandler,
    DAY_OF_WEEK_CONDITION, ITEM_STATE_CONDITION, TIME_OF_DAY_CONDITION,
};
pub use factory::ModuleHandlerFactory;
pub use handler::{Clock, ConditionHandler, Inputs, ModuleHandler, TriggerFired, TriggerHandler};
pub use trigger_handlers::{
    CronTriggerHandler, TimeOfDayTriggerHandler, TriggerHandlerError, TriggerHandlerResult,
    CRON_TRIGGER, TIME_OF_DAY_TRIGGER,
};
