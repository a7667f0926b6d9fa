use anyhow::Result;
use chore_core::push::PushDispatcher;
use chore_core::repository::Repository;
use chore_core::scheduler::ReminderScheduler;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;

/// Runs the trigger loops until Ctrl-C, then waits for in-flight sweeps.
pub async fn serve<R: Repository + 'static>(
    repo: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
    config: &Config,
) -> Result<()> {
    if !dispatcher.is_configured() {
        warn!("push delivery is not configured; reminders will not be sent");
    }

    let scheduler = Arc::new(ReminderScheduler::new(repo, dispatcher, config.scheduler.clone())?);
    let token = CancellationToken::new();
    let handles = Arc::clone(&scheduler).start(token.clone())?;
    info!(
        morning = %config.scheduler.morning_at,
        evening = %config.scheduler.evening_at,
        penalty = %config.scheduler.penalty_at,
        "scheduler running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    token.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            error!("trigger loop ended abnormally: {e}");
        }
    }
    Ok(())
}
