use chore_core::models::{RecurrenceClass, ReminderKind};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Household chores with recurring due dates and daily push reminders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./chore.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the reminder scheduler until interrupted
    Serve,
    /// Run one reminder sweep now across all households
    Sweep(SweepCommand),
    /// Mark a task as done and roll it over to its next due date
    Complete(CompleteCommand),
    /// Preview upcoming due dates without touching the database
    Next(NextCommand),
    /// Remind a task's assignees about it
    Nudge(NudgeCommand),
    /// Hand a task over to another member
    Transfer(TransferCommand),
    /// Send a test notification to every device of a member
    TestPush(TestPushCommand),
    /// Manage households
    Household(HouseholdCommand),
    /// Manage members
    Member(MemberCommand),
    /// Manage tasks
    Task(TaskCommand),
    /// Manage push devices
    Device(DeviceCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SweepCommand {
    /// morning, evening or penalty
    pub kind: ReminderKind,
    /// Instant to sweep as of (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompleteCommand {
    /// Task ID or unique prefix
    pub task: String,
    /// Completion date (YYYY-MM-DD); defaults to today in the household's zone
    #[arg(long)]
    pub on: Option<NaiveDate>,
}

#[derive(Parser, Debug, Clone)]
pub struct NextCommand {
    /// Current due date (YYYY-MM-DD)
    pub from: NaiveDate,
    /// Recurrence class (daily, weekly, monthly, seasonal, half_year, yearly)
    #[arg(long)]
    pub every: RecurrenceClass,
    /// Rule JSON, e.g. '{"mode":"by_weekday","weekday":1,"weekOfMonth":-1}'
    #[arg(long)]
    pub rule: Option<String>,
    /// Completion date; the first result is strictly after it
    #[arg(long)]
    pub not_before: Option<NaiveDate>,
    /// Number of dates to show
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct NudgeCommand {
    /// Task ID or unique prefix
    pub task: String,
    /// Member sending the nudge; never notified themselves
    #[arg(long)]
    pub actor: String,
}

#[derive(Parser, Debug, Clone)]
pub struct TransferCommand {
    /// Task ID or unique prefix
    pub task: String,
    /// Member taking the task over
    #[arg(long)]
    pub to: String,
    /// Member handing the task over
    #[arg(long)]
    pub by: String,
}

#[derive(Parser, Debug, Clone)]
pub struct TestPushCommand {
    /// Member ID or unique prefix
    pub member: String,
}

#[derive(Parser, Debug, Clone)]
pub struct HouseholdCommand {
    #[command(subcommand)]
    pub command: HouseholdSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HouseholdSubcommand {
    /// Add a new household
    Add {
        name: String,
        /// IANA time zone; defaults to the configured default zone
        #[arg(long)]
        timezone: Option<String>,
    },
    /// List households
    List,
}

#[derive(Parser, Debug, Clone)]
pub struct MemberCommand {
    #[command(subcommand)]
    pub command: MemberSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MemberSubcommand {
    /// Add a member to a household
    Add { household: String, name: String },
    /// List the members of a household
    List { household: String },
}

#[derive(Parser, Debug, Clone)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskSubcommand {
    /// Add a task to a household
    Add(TaskAddCommand),
    /// List the tasks of a household
    List { household: String },
}

#[derive(Parser, Debug, Clone)]
pub struct TaskAddCommand {
    /// Household ID or unique prefix
    pub household: String,
    pub title: String,
    /// First due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: NaiveDate,
    /// Recurrence class (once, daily, weekly, monthly, seasonal, half_year, yearly)
    #[arg(long, default_value = "once")]
    pub every: RecurrenceClass,
    /// Rule JSON for month-based classes
    #[arg(long)]
    pub rule: Option<String>,
    /// Primary assignee
    #[arg(long)]
    pub primary: Option<String>,
    /// Secondary assignee, owed the penalty when the primary slacks
    #[arg(long)]
    pub secondary: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeviceCommand {
    #[command(subcommand)]
    pub command: DeviceSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DeviceSubcommand {
    /// Register a push subscription for a member
    Add {
        member: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        p256dh: String,
        #[arg(long)]
        auth: String,
    },
    /// List a member's devices
    List { member: String },
}
