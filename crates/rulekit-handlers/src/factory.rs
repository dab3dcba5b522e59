//! Handler factory
//!
//! Central dispatch from a module's type identifier to a live handler. The
//! factory owns the shared collaborators (scheduler, item registry, trigger
//! sink, clock) and injects them into the handlers it creates; it keeps no
//! per-handler state. Dispatch never fails loudly: unsupported types,
//! category mismatches, and misconfigured triggers are logged and yield no
//! handler so the engine can keep loading the rest of the rule.

use rulekit_core::Module;
use rulekit_items::SharedItemRegistry;
use rulekit_scheduler::Scheduler;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{trace, warn};

use crate::condition_handlers::{
    DayOfWeekConditionHandler, ItemStateConditionHandler, TimeOfDayConditionHandler,
    DAY_OF_WEEK_CONDITION, ITEM_STATE_CONDITION, TIME_OF_DAY_CONDITION,
};
use crate::handler::{Clock, ModuleHandler, TriggerFired};
use crate::trigger_handlers::{
    CronTriggerHandler, TimeOfDayTriggerHandler, CRON_TRIGGER, TIME_OF_DAY_TRIGGER,
};

/// Every type identifier this factory can dispatch
const TYPES: &[&str] = &[
    CRON_TRIGGER,
    TIME_OF_DAY_TRIGGER,
    ITEM_STATE_CONDITION,
    TIME_OF_DAY_CONDITION,
    DAY_OF_WEEK_CONDITION,
];

/// Creates module handlers for the rule engine
pub struct ModuleHandlerFactory {
    scheduler: Arc<dyn Scheduler>,
    items: SharedItemRegistry,
    sink: UnboundedSender<TriggerFired>,
    clock: Clock,
}

impl ModuleHandlerFactory {
    /// Create a factory with its collaborators
    ///
    /// The single scheduler instance is handed to every trigger handler the
    /// factory creates; trigger firings are delivered on `sink`.
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        items: SharedItemRegistry,
        sink: UnboundedSender<TriggerFired>,
    ) -> Self {
        Self {
            scheduler,
            items,
            sink,
            clock: Clock::new(),
        }
    }

    /// Replace the wall-clock source, for tests
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The type identifiers this factory supports
    ///
    /// Advertised so the engine can validate a rule definition before
    /// activating it.
    pub fn supported_types() -> &'static [&'static str] {
        TYPES
    }

    /// Whether a type identifier is supported
    pub fn supports(type_uid: &str) -> bool {
        TYPES.contains(&type_uid)
    }

    /// Create the handler for one module of one rule
    ///
    /// Returns `None` for unknown type identifiers, for identifiers whose
    /// category does not match the module's, and for trigger modules whose
    /// configuration fails to register. By the time a trigger handler is
    /// returned its scheduler registration is active.
    pub fn create(&self, module: &Module, rule_id: &str) -> Option<ModuleHandler> {
        trace!(
            module_id = %module.id(),
            type_uid = %module.type_uid(),
            rule_id,
            "Creating module handler"
        );

        let type_uid = module.type_uid();
        match module {
            Module::Trigger(trigger) if type_uid == CRON_TRIGGER => {
                match CronTriggerHandler::new(
                    trigger,
                    rule_id,
                    self.scheduler.clone(),
                    self.sink.clone(),
                ) {
                    Ok(handler) => Some(ModuleHandler::Trigger(Box::new(handler))),
                    Err(e) => {
                        warn!(
                            module_id = %trigger.id,
                            rule_id,
                            error = %e,
                            "Failed to create cron trigger handler"
                        );
                        None
                    }
                }
            }
            Module::Trigger(trigger) if type_uid == TIME_OF_DAY_TRIGGER => {
                match TimeOfDayTriggerHandler::new(
                    trigger,
                    rule_id,
                    self.scheduler.clone(),
                    self.sink.clone(),
                    self.clock.clone(),
                ) {
                    Ok(handler) => Some(ModuleHandler::Trigger(Box::new(handler))),
                    Err(e) => {
                        warn!(
                            module_id = %trigger.id,
                            rule_id,
                            error = %e,
                            "Failed to create time-of-day trigger handler"
                        );
                        None
                    }
                }
            }
            Module::Condition(condition) if type_uid == ITEM_STATE_CONDITION => {
                Some(ModuleHandler::Condition(Box::new(
                    ItemStateConditionHandler::new(condition, self.items.clone()),
                )))
            }
            Module::Condition(condition) if type_uid == TIME_OF_DAY_CONDITION => {
                Some(ModuleHandler::Condition(Box::new(
                    TimeOfDayConditionHandler::new(condition, self.clock.clone()),
                )))
            }
            Module::Condition(condition) if type_uid == DAY_OF_WEEK_CONDITION => {
                Some(ModuleHandler::Condition(Box::new(
                    DayOfWeekConditionHandler::new(condition, self.clock.clone()),
                )))
            }
            _ => {
                warn!(
                    module_id = %module.id(),
                    type_uid,
                    "The module handler type is not supported"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Inputs;
    use crate::testing::ManualScheduler;
    use chrono::{Local, TimeZone, Utc};
    use rulekit_core::{Condition, Configuration, State, StateType, Trigger};
    use rulekit_items::{Item, ItemRegistry};
    use rulekit_scheduler::TimerScheduler;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn make_factory() -> (
        ModuleHandlerFactory,
        Arc<ManualScheduler>,
        SharedItemRegistry,
        UnboundedReceiver<TriggerFired>,
    ) {
        let scheduler = Arc::new(ManualScheduler::new());
        let items = Arc::new(ItemRegistry::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Clock::fixed(Local.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap());
        let factory = ModuleHandlerFactory::new(scheduler.clone(), items.clone(), tx)
            .with_clock(clock);
        (factory, scheduler, items, rx)
    }

    fn cron_module() -> Module {
        Trigger::new(
            "t1",
            CRON_TRIGGER,
            Configuration::new().with("cronExpression", "0 0 7 * * *"),
        )
        .into()
    }

    fn tod_trigger_module() -> Module {
        Trigger::new(
            "t2",
            TIME_OF_DAY_TRIGGER,
            Configuration::new().with("time", "07:00"),
        )
        .into()
    }

    fn item_state_module() -> Module {
        Condition::new(
            "c1",
            ITEM_STATE_CONDITION,
            Configuration::new()
                .with("itemName", "Temperature")
                .with("operator", ">")
                .with("state", "20"),
        )
        .into()
    }

    fn tod_condition_module() -> Module {
        Condition::new(
            "c2",
            TIME_OF_DAY_CONDITION,
            Configuration::new()
                .with("startTime", "05:00")
                .with("endTime", "08:00"),
        )
        .into()
    }

    fn dow_condition_module() -> Module {
        Condition::new(
            "c3",
            DAY_OF_WEEK_CONDITION,
            Configuration::new().with("days", serde_json::json!(["MON"])),
        )
        .into()
    }

    #[test]
    fn test_create_returns_expected_handler_kinds() {
        let (factory, scheduler, _items, _rx) = make_factory();

        for (module, expect_trigger) in [
            (cron_module(), true),
            (tod_trigger_module(), true),
            (item_state_module(), false),
            (tod_condition_module(), false),
            (dow_condition_module(), false),
        ] {
            let handler = factory.create(&module, "rule-1").unwrap();
            assert_eq!(handler.is_trigger(), expect_trigger, "{}", module.type_uid());
            handler.dispose();
        }

        // Both trigger handlers registered with the shared scheduler.
        assert_eq!(scheduler.cron_expressions(), vec!["0 0 7 * * *"]);
        assert_eq!(scheduler.scheduled_times().len(), 1);
    }

    #[test]
    fn test_create_unknown_type_returns_none() {
        let (factory, _scheduler, _items, _rx) = make_factory();

        let module: Module =
            Trigger::new("t9", "timer.SolarEclipseTrigger", Configuration::new()).into();
        assert!(factory.create(&module, "rule-1").is_none());
    }

    #[test]
    fn test_create_category_mismatch_returns_none() {
        let (factory, scheduler, _items, _rx) = make_factory();

        // A condition module claiming a trigger-only type, and vice versa.
        let bad_condition: Module = Condition::new(
            "c9",
            CRON_TRIGGER,
            Configuration::new().with("cronExpression", "0 0 7 * * *"),
        )
        .into();
        assert!(factory.create(&bad_condition, "rule-1").is_none());

        let bad_trigger: Module = Trigger::new(
            "t9",
            ITEM_STATE_CONDITION,
            Configuration::new()
                .with("itemName", "Temperature")
                .with("operator", "=")
                .with("state", "20"),
        )
        .into();
        assert!(factory.create(&bad_trigger, "rule-1").is_none());

        // Nothing reached the scheduler.
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_create_misconfigured_trigger_returns_none_without_affecting_siblings() {
        let (factory, scheduler, _items, _rx) = make_factory();

        let bad: Module = Trigger::new(
            "t1",
            CRON_TRIGGER,
            Configuration::new().with("cronExpression", "every tuesday"),
        )
        .into();
        assert!(factory.create(&bad, "rule-1").is_none());

        // Sibling modules of the same rule still get handlers.
        let good = factory.create(&cron_module(), "rule-1");
        assert!(good.is_some());
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_supports_agrees_with_create() {
        let (factory, _scheduler, _items, _rx) = make_factory();

        for module in [
            cron_module(),
            tod_trigger_module(),
            item_state_module(),
            tod_condition_module(),
            dow_condition_module(),
        ] {
            assert!(ModuleHandlerFactory::supports(module.type_uid()));
            assert!(factory.create(&module, "rule-1").is_some());
        }

        assert!(!ModuleHandlerFactory::supports("timer.SolarEclipseTrigger"));
        assert_eq!(ModuleHandlerFactory::supported_types().len(), 5);
    }

    #[test]
    fn test_item_state_scenario_through_factory() {
        let (factory, _scheduler, items, _rx) = make_factory();
        items.add(Item::new(
            "Temperature",
            21.5,
            vec![StateType::Decimal, StateType::Str],
        ));

        let handler = factory.create(&item_state_module(), "rule-1").unwrap();
        let condition = handler.as_condition().unwrap();
        assert!(condition.is_satisfied(&Inputs::new()));

        // Same item, colder reading.
        items.set_state("Temperature", State::Decimal(18.0));
        assert!(!condition.is_satisfied(&Inputs::new()));

        // Item removed from the registry entirely.
        items.remove("Temperature");
        assert!(!condition.is_satisfied(&Inputs::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cron_trigger_end_to_end_with_timer_scheduler() {
        let scheduler = Arc::new(TimerScheduler::new());
        let items = Arc::new(ItemRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let factory = ModuleHandlerFactory::new(scheduler, items, tx);

        let module: Module = Trigger::new(
            "t1",
            CRON_TRIGGER,
            // Every second.
            Configuration::new().with("cronExpression", "* * * * * *"),
        )
        .into();
        let handler = factory.create(&module, "rule-1").unwrap();

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.rule_id, "rule-1");
        assert_eq!(fired.module_id, "t1");
        assert!(fired.fired_at <= Utc::now());

        handler.dispose();
        // Drain anything dispatched before disposal; nothing new arrives.
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
