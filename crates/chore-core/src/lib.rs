//! # Chore Core Library
//!
//! Household chore tracking with recurring due dates and daily push
//! reminders.
//!
//! ## Core Modules
//!
//! - [`calendar`]: Month lengths, day clamping and nth-weekday lookup
//! - [`recurrence`]: Next-due-date computation with late-completion skip-forward
//! - [`notification`]: Once-per-day reminder gate and per-subject claims
//! - [`push`]: Push payloads, delivery transport and fan-out dispatcher
//! - [`scheduler`]: Morning, evening and penalty sweeps per household zone
//! - [`actions`]: On-demand nudges, transfers and push tests
//! - [`repository`]: Data access layer with Repository pattern
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`timezone`]: Timezone utilities and validation
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chore_core::{
//!     db,
//!     models::ReminderKind,
//!     push::{PushConfig, PushDispatcher},
//!     repository::{HouseholdRepository, SqliteRepository, SubscriptionRepository},
//!     scheduler::{ReminderScheduler, SchedulerConfig},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("chore.db").await?;
//!     let repo = Arc::new(SqliteRepository::new(pool));
//!     repo.add_household("Flat 3".to_string(), "Europe/Zurich".to_string()).await?;
//!
//!     let subscriptions: Arc<dyn SubscriptionRepository> = repo.clone();
//!     let dispatcher = Arc::new(PushDispatcher::from_config(subscriptions, &PushConfig::default())?);
//!     let scheduler = ReminderScheduler::new(repo, dispatcher, SchedulerConfig::default())?;
//!
//!     let summary = scheduler.run_sweep(ReminderKind::Morning, chrono::Utc::now()).await?;
//!     println!("notified {} members", summary.notified);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod calendar;
pub mod db;
pub mod error;
pub mod models;
pub mod notification;
pub mod push;
pub mod recurrence;
pub mod repository;
pub mod scheduler;
pub mod timezone;
