//! Time-based callback scheduling for rule timers
//!
//! The [`Scheduler`] trait is the capability trigger handlers consume:
//! recurring cron-expression schedules and single-shot absolute-time
//! schedules, each identified by an opaque [`ScheduleToken`] that cancels
//! only its own registration.
//!
//! [`TimerScheduler`] is the tokio implementation. Every registration runs on
//! its own spawned task, so firings execute on the runtime's workers rather
//! than on the thread that creates or disposes handlers. Cancellation flips
//! the registration's live flag before aborting the task: no firing begins
//! after [`Scheduler::cancel`] returns, though a callback already dispatched
//! may complete.

use chrono::{DateTime, Utc};
use cron::Schedule;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use ulid::Ulid;

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// A scheduled callback, invoked with the firing timestamp
pub type Job = Arc<dyn Fn(DateTime<Utc>) + Send + Sync>;

/// Opaque handle to one schedule registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleToken(Ulid);

impl ScheduleToken {
    /// Mint a fresh token; for use by [`Scheduler`] implementations
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ScheduleToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScheduleToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time-based callback registration capability
pub trait Scheduler: Send + Sync {
    /// Register a recurring callback driven by a cron expression
    ///
    /// The expression is validated eagerly; a malformed expression fails here,
    /// before anything is registered.
    fn schedule_cron(&self, expression: &str, job: Job) -> SchedulerResult<ScheduleToken>;

    /// Register a single-shot callback at an absolute instant
    ///
    /// An instant already in the past fires immediately.
    fn schedule_at(&self, at: DateTime<Utc>, job: Job) -> SchedulerResult<ScheduleToken>;

    /// Cancel one registration
    ///
    /// Idempotent; unknown tokens are ignored. Only the named registration is
    /// affected.
    fn cancel(&self, token: &ScheduleToken);
}

struct Registration {
    live: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Tokio-backed [`Scheduler`]
///
/// Must be used from within a tokio runtime: registration spawns the timer
/// task before returning, so no firing can be missed between registration
/// and the caller receiving the token.
pub struct TimerScheduler {
    registrations: Arc<DashMap<ScheduleToken, Registration>>,
}

impl TimerScheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Self {
            registrations: Arc::new(DashMap::new()),
        }
    }

    /// Number of active registrations
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    fn register(
        &self,
        live: Arc<AtomicBool>,
        spawn: impl FnOnce(ScheduleToken) -> JoinHandle<()>,
    ) -> ScheduleToken {
        let token = ScheduleToken::new();
        let handle = spawn(token.clone());
        self.registrations
            .insert(token.clone(), Registration { live, handle });
        token
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TimerScheduler {
    fn schedule_cron(&self, expression: &str, job: Job) -> SchedulerResult<ScheduleToken> {
        let schedule: Schedule =
            expression
                .parse()
                .map_err(|e: cron::error::Error| SchedulerError::InvalidCronExpression {
                    expression: expression.to_string(),
                    reason: e.to_string(),
                })?;

        let live = Arc::new(AtomicBool::new(true));
        let token = self.register(live.clone(), |token| {
            let registrations = self.registrations.clone();
            tokio::spawn(async move {
                loop {
                    let Some(next) = schedule.upcoming(Utc).next() else {
                        trace!(%token, "Cron schedule exhausted");
                        break;
                    };
                    let delay = (next - Utc::now()).to_std().unwrap_or_default();
                    tokio::time::sleep(delay).await;

                    if !live.load(Ordering::SeqCst) {
                        break;
                    }
                    trace!(%token, "Cron schedule firing");
                    job(Utc::now());
                }
                registrations.remove(&token);
            })
        });

        debug!(%token, expression, "Registered cron schedule");
        Ok(token)
    }

    fn schedule_at(&self, at: DateTime<Utc>, job: Job) -> SchedulerResult<ScheduleToken> {
        let live = Arc::new(AtomicBool::new(true));
        let token = self.register(live.clone(), |token| {
            let registrations = self.registrations.clone();
            tokio::spawn(async move {
                let delay = (at - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(delay).await;

                if live.load(Ordering::SeqCst) {
                    trace!(%token, "One-shot schedule firing");
                    job(Utc::now());
                }
                registrations.remove(&token);
            })
        });

        debug!(%token, %at, "Registered one-shot schedule");
        Ok(token)
    }

    fn cancel(&self, token: &ScheduleToken) {
        let Some((_, registration)) = self.registrations.remove(token) else {
            trace!(%token, "Cancel for unknown registration ignored");
            return;
        };

        // Order matters: mark dead before aborting, so a task past its sleep
        // can no longer invoke the job once cancel returns.
        registration.live.store(false, Ordering::SeqCst);
        registration.handle.abort();
        debug!(%token, "Cancelled schedule");
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        for entry in self.registrations.iter() {
            entry.value().live.store(false, Ordering::SeqCst);
            entry.value().handle.abort();
        }
    }
}
