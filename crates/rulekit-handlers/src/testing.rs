//! Hand-cranked scheduler for handler tests
//!
//! Records every registration and fires only when told to, including fires
//! injected after cancellation to model a callback already in flight when a
//! handler is disposed.

use chrono::{DateTime, Utc};
use cron::Schedule;
use rulekit_scheduler::{Job, ScheduleToken, Scheduler, SchedulerError, SchedulerResult};
use std::sync::{Mutex, MutexGuard};

enum ScheduleKind {
    Cron(String),
    At(DateTime<Utc>),
}

struct Entry {
    token: ScheduleToken,
    kind: ScheduleKind,
    job: Job,
    cancelled: bool,
}

pub(crate) struct ManualScheduler {
    entries: Mutex<Vec<Entry>>,
}

impl ManualScheduler {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fire a registration, cancelled or not
    ///
    /// The job runs outside the internal lock so it may re-register.
    pub(crate) fn fire(&self, token: &ScheduleToken, at: DateTime<Utc>) {
        let job = self
            .lock()
            .iter()
            .find(|e| &e.token == token)
            .map(|e| e.job.clone());
        if let Some(job) = job {
            job(at);
        }
    }

    /// Token of the most recent registration
    pub(crate) fn latest_token(&self) -> Option<ScheduleToken> {
        self.lock().last().map(|e| e.token.clone())
    }

    /// Requested instants of every one-shot registration, in order
    pub(crate) fn scheduled_times(&self) -> Vec<DateTime<Utc>> {
        self.lock()
            .iter()
            .filter_map(|e| match e.kind {
                ScheduleKind::At(at) => Some(at),
                ScheduleKind::Cron(_) => None,
            })
            .collect()
    }

    /// Registrations not yet cancelled
    pub(crate) fn active_count(&self) -> usize {
        self.lock().iter().filter(|e| !e.cancelled).count()
    }

    /// Expressions of every cron registration, in order
    pub(crate) fn cron_expressions(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match &e.kind {
                ScheduleKind::Cron(expression) => Some(expression.clone()),
                ScheduleKind::At(_) => None,
            })
            .collect()
    }

    pub(crate) fn is_cancelled(&self, token: &ScheduleToken) -> bool {
        self.lock()
            .iter()
            .any(|e| &e.token == token && e.cancelled)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_cron(&self, expression: &str, job: Job) -> SchedulerResult<ScheduleToken> {
        expression.parse::<Schedule>().map_err(|e| {
            SchedulerError::InvalidCronExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            }
        })?;

        let token = ScheduleToken::new();
        self.lock().push(Entry {
            token: token.clone(),
            kind: ScheduleKind::Cron(expression.to_string()),
            job,
            cancelled: false,
        });
        Ok(token)
    }

    fn schedule_at(&self, at: DateTime<Utc>, job: Job) -> SchedulerResult<ScheduleToken> {
        let token = ScheduleToken::new();
        self.lock().push(Entry {
            token: token.clone(),
            kind: ScheduleKind::At(at),
            job,
            cancelled: false,
        });
        Ok(token)
    }

    fn cancel(&self, token: &ScheduleToken) {
        if let Some(entry) = self.lock().iter_mut().find(|e| &e.token == token) {
            entry.cancelled = true;
        }
    }
}
