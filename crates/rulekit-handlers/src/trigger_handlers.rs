//! Time-based trigger handlers
//!
//! Both handlers translate module configuration into a scheduler registration
//! at construction time and push a [`TriggerFired`] to the rule engine on
//! each fire. Malformed configuration fails construction; the factory logs
//! and withholds the handler.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rulekit_core::{ConfigError, Trigger};
use rulekit_scheduler::{Job, ScheduleToken, Scheduler, SchedulerError};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use crate::handler::{parse_time, Clock, TriggerFired, TriggerHandler};

/// Type identifier of the cron-expression trigger
pub const CRON_TRIGGER: &str = "timer.GenericCronTrigger";

/// Type identifier of the daily time-of-day trigger
pub const TIME_OF_DAY_TRIGGER: &str = "timer.TimeOfDayTrigger";

/// Trigger handler construction errors
#[derive(Debug, Error)]
pub enum TriggerHandlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid time literal '{0}': expected HH:MM or HH:MM:SS")]
    InvalidTime(String),
}

/// Result type for trigger handler construction
pub type TriggerHandlerResult<T> = Result<T, TriggerHandlerError>;

// --- Cron trigger ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CronTriggerConfig {
    cron_expression: String,
}

/// Recurring trigger driven by a cron expression
///
/// The expression is validated and the recurring registration is active
/// before construction returns, so no firing can be missed afterwards.
pub struct CronTriggerHandler {
    scheduler: Arc<dyn Scheduler>,
    token: ScheduleToken,
    live: Arc<AtomicBool>,
}

impl CronTriggerHandler {
    /// Create the handler and register its schedule
    pub fn new(
        trigger: &Trigger,
        rule_id: &str,
        scheduler: Arc<dyn Scheduler>,
        sink: UnboundedSender<TriggerFired>,
    ) -> TriggerHandlerResult<Self> {
        let config: CronTriggerConfig = trigger.configuration.decode()?;

        let live = Arc::new(AtomicBool::new(true));
        let job: Job = {
            let live = live.clone();
            let rule_id = rule_id.to_string();
            let module_id = trigger.id.clone();
            Arc::new(move |fired_at| {
                if !live.load(Ordering::SeqCst) {
                    return;
                }
                trace!(rule_id = %rule_id, module_id = %module_id, "Cron trigger fired");
                let _ = sink.send(TriggerFired {
                    rule_id: rule_id.clone(),
                    module_id: module_id.clone(),
                    fired_at,
                });
            })
        };

        let token = scheduler.schedule_cron(&config.cron_expression, job)?;
        debug!(
            module_id = %trigger.id,
            rule_id,
            expression = %config.cron_expression,
            "Armed cron trigger"
        );

        Ok(Self {
            scheduler,
            token,
            live,
        })
    }
}

impl TriggerHandler for CronTriggerHandler {
    fn dispose(&self) {
        // Flag first: a fire that slips past cancellation delivers nothing.
        self.live.store(false, Ordering::SeqCst);
        self.scheduler.cancel(&self.token);
    }
}

impl Drop for CronTriggerHandler {
    fn drop(&mut self) {
        self.dispose();
    }
}

// --- Time-of-day trigger ---

#[derive(Debug, Deserialize)]
struct TimeOfDayTriggerConfig {
    time: String,
}

struct Armed {
    live: bool,
    token: Option<ScheduleToken>,
}

struct TimeOfDayShared {
    scheduler: Arc<dyn Scheduler>,
    sink: UnboundedSender<TriggerFired>,
    rule_id: String,
    module_id: String,
    at: NaiveTime,
    clock: Clock,
    armed: Mutex<Armed>,
}

impl TimeOfDayShared {
    fn lock(&self) -> MutexGuard<'_, Armed> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Daily trigger firing at a fixed local time
///
/// Each fire re-arms the handler for the following day. Re-arming and
/// disposal synchronize on the same lock, so a disposed handler is never
/// resurrected by an in-flight fire.
pub struct TimeOfDayTriggerHandler {
    shared: Arc<TimeOfDayShared>,
}

impl TimeOfDayTriggerHandler {
    /// Create the handler and register its first occurrence
    pub fn new(
        trigger: &Trigger,
        rule_id: &str,
        scheduler: Arc<dyn Scheduler>,
        sink: UnboundedSender<TriggerFired>,
        clock: Clock,
    ) -> TriggerHandlerResult<Self> {
        let config: TimeOfDayTriggerConfig = trigger.configuration.decode()?;
        let at = parse_time(&config.time)
            .ok_or_else(|| TriggerHandlerError::InvalidTime(config.time.clone()))?;

        let shared = Arc::new(TimeOfDayShared {
            scheduler,
            sink,
            rule_id: rule_id.to_string(),
            module_id: trigger.id.clone(),
            at,
            clock,
            armed: Mutex::new(Armed {
                live: true,
                token: None,
            }),
        });

        Self::arm(&shared)?;
        debug!(module_id = %trigger.id, rule_id, time = %at, "Armed time-of-day trigger");

        Ok(Self { shared })
    }

    /// The next occurrence of the configured time, by the handler's clock
    fn next_occurrence(shared: &TimeOfDayShared) -> DateTime<Utc> {
        let now = shared.clock.now();
        let today = now.date_naive().and_time(shared.at);
        let next = if today > now.naive_local() {
            today
        } else {
            today + Duration::days(1)
        };
        local_to_utc(next)
    }

    /// Register the next occurrence, unless the handler was disposed
    fn arm(shared: &Arc<TimeOfDayShared>) -> TriggerHandlerResult<()> {
        let next = Self::next_occurrence(shared);
        let job: Job = {
            let shared = shared.clone();
            Arc::new(move |fired_at| Self::on_fire(&shared, fired_at))
        };
        let token = shared.scheduler.schedule_at(next, job)?;

        let mut armed = shared.lock();
        if armed.live {
            armed.token = Some(token);
        } else {
            // Disposed while we were registering; take the schedule back.
            drop(armed);
            shared.scheduler.cancel(&token);
        }
        Ok(())
    }

    fn on_fire(shared: &Arc<TimeOfDayShared>, fired_at: DateTime<Utc>) {
        {
            let armed = shared.lock();
            if !armed.live {
                trace!(module_id = %shared.module_id, "Ignoring fire after disposal");
                return;
            }
        }

        trace!(
            rule_id = %shared.rule_id,
            module_id = %shared.module_id,
            "Time-of-day trigger fired"
        );
        let _ = shared.sink.send(TriggerFired {
            rule_id: shared.rule_id.clone(),
            module_id: shared.module_id.clone(),
            fired_at,
        });

        // Perpetual rearm for the following day.
        if let Err(e) = Self::arm(shared) {
            warn!(
                module_id = %shared.module_id,
                error = %e,
                "Failed to re-arm time-of-day trigger"
            );
        }
    }
}

impl TriggerHandler for TimeOfDayTriggerHandler {
    fn dispose(&self) {
        let token = {
            let mut armed = self.shared.lock();
            armed.live = false;
            armed.token.take()
        };
        if let Some(token) = token {
            self.shared.scheduler.cancel(&token);
        }
    }
}

impl Drop for TimeOfDayTriggerHandler {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Resolve a naive local datetime to UTC, tolerating DST folds and gaps
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    use chrono::offset::LocalResult;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Nonexistent local time (DST gap); shift forward an hour.
            match Local.from_local_datetime(&(naive + Duration::hours(1))) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}
