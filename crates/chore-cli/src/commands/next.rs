use anyhow::{anyhow, Result};
use chore_core::recurrence::{RecurrenceEngine, RecurrenceRule};

use crate::cli::NextCommand;

/// Prints the next `count` due dates of a schedule. Nothing is stored.
pub fn preview_next(command: NextCommand) -> Result<()> {
    if !command.every.is_recurring() {
        return Err(anyhow!("one-off tasks have no next due date"));
    }

    let rule = RecurrenceRule::from_stored(command.rule.as_deref())?;
    let engine = RecurrenceEngine::new();

    let mut due = engine.advance(command.from, command.every, rule.as_ref(), command.not_before)?;
    for i in 0..command.count {
        if i > 0 {
            due = engine.step(due, command.every, rule.as_ref())?;
        }
        println!("{}", due.format("%a %Y-%m-%d"));
    }
    Ok(())
}
