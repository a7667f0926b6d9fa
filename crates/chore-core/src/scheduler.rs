//! Daily reminder sweeps.
//!
//! Three triggers (morning, evening, penalty) fire at fixed wall-clock
//! times, evaluated per household in the household's own zone. A sweep is a
//! function of an instant plus store state ([`ReminderScheduler::run_sweep`]);
//! [`ReminderScheduler::start`] drives it from background tick loops.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{AssigneeScope, Household, ReminderKind, Task};
use crate::notification::{should_fire, ClaimLocks};
use crate::push::{DispatchReport, ErrorDetail, PushDispatcher, PushPayload};
use crate::repository::Repository;
use crate::timezone::{local_date, local_time};

/// Task titles listed in an aggregated reminder before "and N more".
const MAX_TITLES_IN_BODY: usize = 3;

/// Trigger times and loop cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Local wall-clock time of the morning sweep ("HH:MM")
    pub morning_at: String,
    pub evening_at: String,
    pub penalty_at: String,
    /// Seconds between trigger checks
    pub tick_interval_secs: u64,
    /// How long after the nominal time a household may still be swept
    pub catch_up_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            morning_at: "07:00".to_string(),
            evening_at: "20:00".to_string(),
            penalty_at: "21:00".to_string(),
            tick_interval_secs: 30,
            catch_up_minutes: 59,
        }
    }
}

impl SchedulerConfig {
    pub fn trigger_time(&self, kind: ReminderKind) -> Result<NaiveTime, CoreError> {
        let raw = match kind {
            ReminderKind::Morning => &self.morning_at,
            ReminderKind::Evening => &self.evening_at,
            ReminderKind::Penalty => &self.penalty_at,
        };
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| CoreError::InvalidInput(format!("invalid {} trigger time '{}'", kind, raw)))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for kind in ReminderKind::ALL {
            self.trigger_time(kind)?;
        }
        if self.catch_up_minutes == 0 {
            return Err(CoreError::InvalidInput("catch_up_minutes must be positive".to_string()));
        }
        Ok(())
    }

    /// Whether `local` falls in `[trigger, trigger + catch_up)`. The window
    /// does not extend past midnight.
    pub fn in_window(&self, trigger: NaiveTime, local: NaiveTime) -> bool {
        let elapsed = local.signed_duration_since(trigger);
        elapsed >= ChronoDuration::zero() && elapsed < ChronoDuration::minutes(i64::from(self.catch_up_minutes))
    }
}

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counts of one sweep across all households it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub kind: ReminderKind,
    /// `false` when push is unconfigured and the sweep did nothing
    pub configured: bool,
    pub households: usize,
    /// Subjects (members or tasks) that received a dispatch
    pub notified: usize,
    /// Subjects already notified today or with nothing due
    pub skipped: usize,
    pub sent: usize,
    pub failed: usize,
    pub pruned: usize,
    pub errors: Vec<ErrorDetail>,
    /// Subjects whose processing failed before or after dispatch
    pub subject_failures: usize,
}

impl SweepSummary {
    fn new(kind: ReminderKind, configured: bool) -> Self {
        Self {
            kind,
            configured,
            households: 0,
            notified: 0,
            skipped: 0,
            sent: 0,
            failed: 0,
            pruned: 0,
            errors: Vec::new(),
            subject_failures: 0,
        }
    }

    fn record(&mut self, outcome: SubjectOutcome) {
        match outcome {
            SubjectOutcome::AlreadyFired | SubjectOutcome::NothingDue => self.skipped += 1,
            SubjectOutcome::Notified(report) => {
                self.notified += 1;
                self.sent += report.sent;
                self.failed += report.failed;
                self.pruned += report.pruned;
                self.errors.extend(report.errors);
            }
        }
    }

    fn record_subject_failure(&mut self, error: &CoreError) {
        self.subject_failures += 1;
        self.errors.push(ErrorDetail::new("subject", error.to_string()));
    }
}

enum SubjectOutcome {
    AlreadyFired,
    NothingDue,
    Notified(DispatchReport),
}

/// ReminderScheduler: sends the daily chore reminders.
///
/// Responsibilities:
/// 1. Compute "today" per household in its own zone
/// 2. Gate every subject through its once-per-day marker
/// 3. Dispatch and record the marker, one subject at a time
pub struct ReminderScheduler<R: Repository + 'static> {
    store: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    claims: ClaimLocks,
}

impl<R: Repository + 'static> ReminderScheduler<R> {
    pub fn new(store: Arc<R>, dispatcher: Arc<PushDispatcher>, config: SchedulerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            store,
            dispatcher,
            clock: Arc::new(SystemClock),
            config,
            claims: ClaimLocks::new(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs the `kind` sweep over every household as of `now`, ignoring
    /// trigger times.
    ///
    /// Fails only when households cannot be enumerated; failures of single
    /// households or subjects are counted in the summary.
    pub async fn run_sweep(&self, kind: ReminderKind, now: DateTime<Utc>) -> Result<SweepSummary, CoreError> {
        let mut summary = SweepSummary::new(kind, self.dispatcher.is_configured());
        if !summary.configured {
            info!(%kind, "push not configured, sweep skipped");
            return Ok(summary);
        }

        info!(%kind, %now, "sweep started");
        for household in self.store.find_households().await? {
            self.sweep_household_at(kind, &household, now, &mut summary).await;
        }
        self.claims.prune();

        info!(
            %kind,
            households = summary.households,
            notified = summary.notified,
            skipped = summary.skipped,
            sent = summary.sent,
            failed = summary.failed,
            "sweep finished"
        );
        Ok(summary)
    }

    /// One trigger check: sweeps the households whose local time lies in
    /// the trigger's window and which `fired` does not list for their
    /// current local date. Only households swept without subject failures
    /// are added to `fired`, so failed subjects are retried on later ticks
    /// inside the window.
    pub async fn tick(
        &self,
        kind: ReminderKind,
        trigger: NaiveTime,
        now: DateTime<Utc>,
        fired: &mut HashMap<Uuid, NaiveDate>,
    ) -> Result<SweepSummary, CoreError> {
        let mut summary = SweepSummary::new(kind, self.dispatcher.is_configured());
        if !summary.configured {
            return Ok(summary);
        }

        for household in self.store.find_households().await? {
            let tz = match household.tz() {
                Ok(tz) => tz,
                Err(e) => {
                    warn!(household_id = %household.id, "skipping household: {e}");
                    continue;
                }
            };
            let today = local_date(tz, now);
            if fired.get(&household.id) == Some(&today) || !self.config.in_window(trigger, local_time(tz, now)) {
                continue;
            }

            // A household with failed subjects stays eligible; markers keep
            // the subjects that did go out from firing twice.
            let failures_before = summary.subject_failures;
            self.sweep_household_at(kind, &household, now, &mut summary).await;
            if summary.subject_failures == failures_before {
                fired.insert(household.id, today);
            }
        }

        if summary.households > 0 {
            self.claims.prune();
            info!(
                %kind,
                households = summary.households,
                notified = summary.notified,
                sent = summary.sent,
                failed = summary.failed,
                "trigger fired"
            );
        }
        Ok(summary)
    }

    /// Spawns one tick loop per trigger. The loops stop once `token` is
    /// cancelled; a sweep already in progress runs to completion first.
    pub fn start(self: Arc<Self>, token: CancellationToken) -> Result<Vec<JoinHandle<()>>, CoreError> {
        let mut handles = Vec::with_capacity(ReminderKind::ALL.len());
        for kind in ReminderKind::ALL {
            let trigger = self.config.trigger_time(kind)?;
            let scheduler = Arc::clone(&self);
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                scheduler.trigger_loop(kind, trigger, token).await;
            }));
        }
        Ok(handles)
    }

    async fn trigger_loop(&self, kind: ReminderKind, trigger: NaiveTime, token: CancellationToken) {
        info!(%kind, %trigger, "trigger started");
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.tick_interval_secs.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut fired = HashMap::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            if let Err(e) = self.tick(kind, trigger, self.clock.now(), &mut fired).await {
                error!(%kind, "trigger check failed: {e}");
            }
        }
        info!(%kind, "trigger stopped");
    }

    async fn sweep_household_at(
        &self,
        kind: ReminderKind,
        household: &Household,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) {
        let today = match household.tz() {
            Ok(tz) => local_date(tz, now),
            Err(e) => {
                warn!(household_id = %household.id, "skipping household: {e}");
                summary.record_subject_failure(&e);
                return;
            }
        };

        summary.households += 1;
        if let Err(e) = self.sweep_household(kind, household, today, summary).await {
            error!(household_id = %household.id, %kind, "household sweep aborted: {e}");
            summary.record_subject_failure(&e);
        }
    }

    async fn sweep_household(
        &self,
        kind: ReminderKind,
        household: &Household,
        today: NaiveDate,
        summary: &mut SweepSummary,
    ) -> Result<(), CoreError> {
        match kind {
            ReminderKind::Morning | ReminderKind::Evening => {
                for member in self.store.find_members_by_household(household.id).await? {
                    match self.notify_member(kind, member.id, today).await {
                        Ok(outcome) => summary.record(outcome),
                        Err(e) => {
                            error!(member_id = %member.id, %kind, "member reminder failed: {e}");
                            summary.record_subject_failure(&e);
                        }
                    }
                }
            }
            ReminderKind::Penalty => {
                for task in self.store.find_due_tasks(household.id, today).await? {
                    match self.notify_penalty(task.id, today).await {
                        Ok(outcome) => summary.record(outcome),
                        Err(e) => {
                            error!(task_id = %task.id, "penalty reminder failed: {e}");
                            summary.record_subject_failure(&e);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn notify_member(&self, kind: ReminderKind, member_id: Uuid, today: NaiveDate) -> Result<SubjectOutcome, CoreError> {
        let _claim = self.claims.acquire(member_id, kind).await;

        // Re-read under the claim; another sweep may have just written the marker
        let member = self
            .store
            .find_member_by_id(member_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("member {}", member_id)))?;
        if !should_fire(member.id, kind, today, member.marker(kind)) {
            return Ok(SubjectOutcome::AlreadyFired);
        }

        let scope = match kind {
            ReminderKind::Evening => AssigneeScope::PrimaryOnly,
            _ => AssigneeScope::PrimaryOrSecondary,
        };
        let tasks = self
            .store
            .find_due_tasks_for_member(member.household_id, member.id, today, scope)
            .await?;
        if tasks.is_empty() {
            debug!(member_id = %member.id, %kind, "nothing due");
            return Ok(SubjectOutcome::NothingDue);
        }

        let payload = due_tasks_payload(kind, &tasks, today);
        let report = self.dispatcher.dispatch(member.id, &payload).await?;
        self.store.set_member_marker(member.id, kind, today).await?;
        Ok(SubjectOutcome::Notified(report))
    }

    async fn notify_penalty(&self, task_id: Uuid, today: NaiveDate) -> Result<SubjectOutcome, CoreError> {
        let _claim = self.claims.acquire(task_id, ReminderKind::Penalty).await;

        let task = self
            .store
            .find_task_by_id(task_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {}", task_id)))?;
        let Some(primary) = task.primary_assignee_id.filter(|_| task.active && task.due_date <= today) else {
            return Ok(SubjectOutcome::NothingDue);
        };
        if !should_fire(task.id, ReminderKind::Penalty, today, task.last_penalty_date) {
            return Ok(SubjectOutcome::AlreadyFired);
        }

        let owed = match task.secondary_assignee_id.filter(|&secondary| secondary != primary) {
            Some(secondary) => self.store.find_member_by_id(secondary).await?.map(|m| m.name),
            None => None,
        };

        let payload = penalty_payload(&task, owed.as_deref(), today);
        let report = self.dispatcher.dispatch(primary, &payload).await?;
        self.store.set_penalty_marker(task.id, today).await?;
        Ok(SubjectOutcome::Notified(report))
    }
}

fn due_tasks_payload(kind: ReminderKind, tasks: &[Task], today: NaiveDate) -> PushPayload {
    let count = tasks.len();
    let noun = if count == 1 { "task" } else { "tasks" };
    let titles: Vec<&str> = tasks.iter().take(MAX_TITLES_IN_BODY).map(|t| t.title.as_str()).collect();
    let mut listed = titles.join(", ");
    if count > titles.len() {
        listed.push_str(&format!(" and {} more", count - titles.len()));
    }

    let title = match kind {
        ReminderKind::Evening => "Still open tonight",
        _ => "Chores for today",
    };
    PushPayload::new(title, format!("{} {} due: {}", count, noun, listed)).with_tag(format!("{}-{}", kind, today))
}

fn penalty_payload(task: &Task, owed: Option<&str>, today: NaiveDate) -> PushPayload {
    let body = match owed {
        Some(name) => format!("'{}' is still open. You owe {} a penalty.", task.title, name),
        None => format!("'{}' is still open.", task.title),
    };
    PushPayload::new("Penalty", body).with_tag(format!("{}-{}-{}", ReminderKind::Penalty, today, task.id.simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecurrenceClass;
    use rstest::rstest;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn task(title: &str) -> Task {
        Task {
            id: Uuid::now_v7(),
            household_id: Uuid::now_v7(),
            title: title.to_string(),
            recurrence_class: RecurrenceClass::Weekly,
            rule: None,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            primary_assignee_id: None,
            secondary_assignee_id: None,
            active: true,
            last_penalty_date: None,
            transferred_from_id: None,
            transferred_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_trigger_times() {
        let config = SchedulerConfig::default();
        assert_eq!(config.trigger_time(ReminderKind::Morning).unwrap(), time(7, 0));
        assert_eq!(config.trigger_time(ReminderKind::Evening).unwrap(), time(20, 0));
        assert_eq!(config.trigger_time(ReminderKind::Penalty).unwrap(), time(21, 0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trigger_time_accepts_seconds_and_rejects_garbage() {
        let config = SchedulerConfig {
            morning_at: "06:30:15".to_string(),
            evening_at: "8pm".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.trigger_time(ReminderKind::Morning).unwrap(),
            NaiveTime::from_hms_opt(6, 30, 15).unwrap()
        );
        assert!(matches!(config.trigger_time(ReminderKind::Evening), Err(CoreError::InvalidInput(_))));
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(time(6, 59), false)]
    #[case(time(7, 0), true)]
    #[case(time(7, 58), true)]
    #[case(time(7, 59), false)]
    #[case(time(12, 0), false)]
    fn test_in_window(#[case] local: NaiveTime, #[case] expected: bool) {
        let config = SchedulerConfig::default();
        assert_eq!(config.in_window(time(7, 0), local), expected);
    }

    #[test]
    fn test_window_stops_at_midnight() {
        let config = SchedulerConfig { catch_up_minutes: 120, ..Default::default() };
        assert!(config.in_window(time(23, 30), time(23, 59)));
        assert!(!config.in_window(time(23, 30), time(0, 15)));
    }

    #[test]
    fn test_fixed_clock() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        let later = start + ChronoDuration::hours(1);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_due_tasks_payload() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let single = due_tasks_payload(ReminderKind::Morning, &[task("Bins")], today);
        assert_eq!(single.body, "1 task due: Bins");
        assert_eq!(single.tag.as_deref(), Some("morning-2024-03-01"));

        let many: Vec<Task> = ["Bins", "Dishes", "Laundry", "Plants", "Windows"].iter().map(|t| task(t)).collect();
        let aggregated = due_tasks_payload(ReminderKind::Evening, &many, today);
        assert_eq!(aggregated.title, "Still open tonight");
        assert_eq!(aggregated.body, "5 tasks due: Bins, Dishes, Laundry and 2 more");
        assert_eq!(aggregated.tag.as_deref(), Some("evening-2024-03-01"));
    }

    #[test]
    fn test_penalty_payload_names_the_owed_member() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bins = task("Bins");

        let owed = penalty_payload(&bins, Some("Bob"), today);
        assert_eq!(owed.body, "'Bins' is still open. You owe Bob a penalty.");
        assert!(owed.tag.unwrap().starts_with("penalty-2024-03-01-"));

        let alone = penalty_payload(&bins, None, today);
        assert_eq!(alone.body, "'Bins' is still open.");
    }
}
