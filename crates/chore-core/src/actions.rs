//! On-demand notifications triggered by a member: nudges, task transfers
//! and push connectivity tests.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Member, Task};
use crate::push::{DispatchReport, PushDispatcher, PushPayload};
use crate::repository::Repository;

pub struct Actions<R: Repository> {
    store: Arc<R>,
    dispatcher: Arc<PushDispatcher>,
}

impl<R: Repository> Actions<R> {
    pub fn new(store: Arc<R>, dispatcher: Arc<PushDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Reminds the task's assignees about it. The actor is never notified,
    /// even when assigned.
    pub async fn nudge(&self, task_id: Uuid, actor_id: Uuid) -> Result<DispatchReport, CoreError> {
        let task = self.task(task_id).await?;
        let actor = self.member_of(actor_id, &task).await?;

        let payload = PushPayload::new(
            format!("Reminder: {}", task.title),
            format!("{} nudged you about this chore.", actor.name),
        )
        .with_url(task_url(&task));

        let report = self.dispatcher.dispatch_many(&task.assignees(), &payload, Some(actor.id)).await;
        info!(task_id = %task.id, actor_id = %actor.id, sent = report.sent, failed = report.failed, "nudge sent");
        Ok(report)
    }

    /// Hands the task to `to` and tells them about it.
    pub async fn transfer(&self, task_id: Uuid, to: Uuid, by: Uuid) -> Result<(Task, DispatchReport), CoreError> {
        let task = self.task(task_id).await?;
        let giver = self.member_of(by, &task).await?;

        let task = self.store.transfer_task(task.id, to, giver.id, Utc::now()).await?;
        let payload = PushPayload::new(
            "Chore handed over",
            format!("{} handed '{}' to you.", giver.name, task.title),
        )
        .with_url(task_url(&task));

        let report = self.dispatcher.dispatch_many(&[to], &payload, Some(giver.id)).await;
        info!(task_id = %task.id, from = %giver.id, %to, sent = report.sent, "task transferred");
        Ok((task, report))
    }

    /// Sends a test notification to every device of the member.
    pub async fn test_push(&self, member_id: Uuid) -> Result<DispatchReport, CoreError> {
        let member = self
            .store
            .find_member_by_id(member_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("member {}", member_id)))?;

        let payload = PushPayload::new("Test notification", format!("Push works for {}.", member.name))
            .with_tag("test");
        self.dispatcher.dispatch(member.id, &payload).await
    }

    async fn task(&self, id: Uuid) -> Result<Task, CoreError> {
        self.store
            .find_task_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {}", id)))
    }

    async fn member_of(&self, id: Uuid, task: &Task) -> Result<Member, CoreError> {
        let member = self
            .store
            .find_member_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("member {}", id)))?;
        if member.household_id != task.household_id {
            return Err(CoreError::InvalidInput(format!(
                "{} is not in the household of '{}'",
                member.name, task.title
            )));
        }
        Ok(member)
    }
}

fn task_url(task: &Task) -> String {
    format!("/tasks/{}", task.id)
}
