use anyhow::Result;
use chore_core::models::CompletionResult;
use chore_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::CompleteCommand;
use crate::util::resolve_task_id;

pub async fn complete_task(repo: &impl Repository, command: CompleteCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.task).await?;

    match repo.complete_task(task_id, command.on).await? {
        CompletionResult::Finished(task) => {
            println!("Completed task: '{}'", task.title);
        }
        CompletionResult::Rescheduled { task, previous_due, next_due, bound_hit } => {
            println!("Completed task: '{}' (was due {})", task.title, previous_due);
            println!("Next due: {}", next_due.format("%a %Y-%m-%d"));
            if bound_hit {
                println!(
                    "{}",
                    "Warning: the next due date is not after the completion date; check the task's rule.".yellow()
                );
            }
        }
    }

    Ok(())
}
