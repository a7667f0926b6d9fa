//! Once-per-day idempotency for reminders.
//!
//! Each subject (a member for morning/evening, a task for penalty) carries
//! one "last fired" date per reminder kind. A sweep fires for a subject only
//! when that date is not today, and writes today's date only after the
//! dispatch for that subject returned.
//!
//! The read-check-dispatch-write sequence must not interleave for the same
//! subject, so sweeps hold a [`ClaimLocks`] guard across it.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use uuid::Uuid;

use crate::models::ReminderKind;

/// Returns true iff the reminder has not fired for `subject` today.
pub fn should_fire(
    subject: Uuid,
    kind: ReminderKind,
    today: NaiveDate,
    last_fired: Option<NaiveDate>,
) -> bool {
    let fire = last_fired != Some(today);
    if !fire {
        debug!(%subject, %kind, %today, "reminder already fired today");
    }
    fire
}

type ClaimKey = (Uuid, ReminderKind);

/// One async mutex per `(subject, kind)`.
#[derive(Debug, Default)]
pub struct ClaimLocks {
    locks: Mutex<HashMap<ClaimKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held while a subject's marker is checked, the push is sent and the
/// marker is written.
pub struct Claim {
    _guard: OwnedMutexGuard<()>,
}

impl ClaimLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds the claim for `(subject, kind)`.
    pub async fn acquire(&self, subject: Uuid, kind: ReminderKind) -> Claim {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry((subject, kind))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        Claim { _guard: lock.lock_owned().await }
    }

    /// Drops locks nobody holds or waits on.
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
