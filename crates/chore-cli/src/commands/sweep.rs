use anyhow::Result;
use chore_core::push::PushDispatcher;
use chore_core::repository::Repository;
use chore_core::scheduler::ReminderScheduler;
use chrono::Utc;
use std::sync::Arc;

use crate::cli::SweepCommand;
use crate::config::Config;
use crate::views::report::print_sweep_summary;

pub async fn run_sweep<R: Repository + 'static>(
    repo: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
    command: SweepCommand,
    config: &Config,
) -> Result<()> {
    let scheduler = ReminderScheduler::new(repo, dispatcher, config.scheduler.clone())?;
    let now = command.at.unwrap_or_else(Utc::now);

    let summary = scheduler.run_sweep(command.kind, now).await?;
    print_sweep_summary(&summary);
    Ok(())
}
