use anyhow::Result;
use chore_core::actions::Actions;
use chore_core::push::PushDispatcher;
use chore_core::repository::Repository;
use std::sync::Arc;

use crate::cli::{NudgeCommand, TestPushCommand, TransferCommand};
use crate::util::{resolve_member_id, resolve_task_id};
use crate::views::report::print_dispatch_report;

pub async fn nudge<R: Repository + 'static>(
    repo: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
    command: NudgeCommand,
) -> Result<()> {
    let task_id = resolve_task_id(&*repo, &command.task).await?;
    let actor_id = resolve_member_id(&*repo, &command.actor).await?;

    let report = Actions::new(repo, dispatcher).nudge(task_id, actor_id).await?;
    print_dispatch_report(&report);
    Ok(())
}

pub async fn transfer<R: Repository + 'static>(
    repo: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
    command: TransferCommand,
) -> Result<()> {
    let task_id = resolve_task_id(&*repo, &command.task).await?;
    let to = resolve_member_id(&*repo, &command.to).await?;
    let by = resolve_member_id(&*repo, &command.by).await?;

    let (task, report) = Actions::new(repo, dispatcher).transfer(task_id, to, by).await?;
    println!("Transferred '{}'.", task.title);
    print_dispatch_report(&report);
    Ok(())
}

pub async fn test_push<R: Repository + 'static>(
    repo: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
    command: TestPushCommand,
) -> Result<()> {
    let member_id = resolve_member_id(&*repo, &command.member).await?;

    let report = Actions::new(repo, dispatcher).test_push(member_id).await?;
    print_dispatch_report(&report);
    Ok(())
}
