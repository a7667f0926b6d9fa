use anyhow::Result;
use chore_core::error::CoreError;
use chore_core::models::NewTaskData;
use chore_core::repository::Repository;
use chore_core::timezone::local_date;
use chrono::Utc;
use std::collections::HashMap;

use crate::cli::{TaskAddCommand, TaskCommand, TaskSubcommand};
use crate::util::{resolve_household_id, resolve_member_id};
use crate::views::table::display_tasks;

pub async fn task_command(repo: &impl Repository, command: TaskCommand) -> Result<()> {
    match command.command {
        TaskSubcommand::Add(add_command) => add_task(repo, add_command).await,
        TaskSubcommand::List { household } => list_tasks(repo, &household).await,
    }
}

async fn add_task(repo: &impl Repository, command: TaskAddCommand) -> Result<()> {
    let household_id = resolve_household_id(repo, &command.household).await?;
    let primary_assignee_id = match command.primary.as_deref() {
        Some(member) => Some(resolve_member_id(repo, member).await?),
        None => None,
    };
    let secondary_assignee_id = match command.secondary.as_deref() {
        Some(member) => Some(resolve_member_id(repo, member).await?),
        None => None,
    };

    let task = repo
        .add_task(NewTaskData {
            household_id,
            title: command.title,
            recurrence_class: command.every,
            rule: command.rule,
            due_date: command.due,
            primary_assignee_id,
            secondary_assignee_id,
        })
        .await?;

    println!(
        "Added task '{}' ({}, due {}) with ID {}",
        task.title, task.recurrence_class, task.due_date, task.id
    );
    Ok(())
}

async fn list_tasks(repo: &impl Repository, household: &str) -> Result<()> {
    let household_id = resolve_household_id(repo, household).await?;
    let household = repo
        .find_household_by_id(household_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Household {household_id} not found")))?;
    let today = local_date(household.tz()?, Utc::now());

    let names: HashMap<_, _> = repo
        .find_members_by_household(household_id)
        .await?
        .into_iter()
        .map(|m| (m.id, m.name))
        .collect();
    let tasks = repo.find_tasks_by_household(household_id).await?;
    display_tasks(&tasks, today, &names);
    Ok(())
}
