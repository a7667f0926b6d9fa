use chore_core::models::{Household, Member, PushSubscription, RecurrenceClass, Task};
use chore_core::timezone::format_with_timezone;
use chrono::{NaiveDate, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use std::collections::HashMap;
use uuid::Uuid;

use crate::util::short_id;

pub fn display_households(households: &[Household]) {
    if households.is_empty() {
        println!("No households found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Time Zone", "Local Time", "Created"]);

    let now = Utc::now();
    for household in households {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(household.id)));
        row.add_cell(Cell::new(&household.name));
        row.add_cell(Cell::new(&household.timezone));
        let local = format_with_timezone(now, &household.timezone, "%a %H:%M").unwrap_or_else(|_| "?".to_string());
        row.add_cell(Cell::new(local));
        row.add_cell(Cell::new((household.created_at - now).humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_members(members: &[Member]) {
    if members.is_empty() {
        println!("No members found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Last Morning Push", "Last Evening Push"]);

    for member in members {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(member.id)));
        row.add_cell(Cell::new(&member.name));
        row.add_cell(marker_cell(member.last_daily_push_date));
        row.add_cell(marker_cell(member.last_evening_push_date));
        table.add_row(row);
    }

    println!("{table}");
}

/// Renders tasks; `today` is the household's local date and `names` maps
/// member IDs to display names.
pub fn display_tasks(tasks: &[Task], today: NaiveDate, names: &HashMap<Uuid, String>) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let name_of = |id: Option<Uuid>| -> String {
        id.map(|id| names.get(&id).cloned().unwrap_or_else(|| short_id(id)))
            .unwrap_or_else(|| "None".to_string())
    };

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Every", "Due", "Primary", "Secondary"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(task.id)));

        let mut title = String::new();
        if task.recurrence_class != RecurrenceClass::Once {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(&task.title);
        if let Some(from) = task.transferred_from_id {
            title.push_str(&format!(" (from {})", name_of(Some(from))));
        }

        let title_cell = if !task.active {
            Cell::new(title).add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey)
        } else {
            Cell::new(title)
        };
        row.add_cell(title_cell);
        row.add_cell(Cell::new(task.recurrence_class.to_string()));

        let due = Cell::new(task.due_date.to_string());
        let due = if !task.active {
            due
        } else if task.due_date < today {
            due.fg(Color::Red) // Overdue
        } else if task.due_date == today {
            due.fg(Color::Yellow) // Due today
        } else {
            due
        };
        row.add_cell(due);

        row.add_cell(Cell::new(name_of(task.primary_assignee_id)));
        row.add_cell(Cell::new(name_of(task.secondary_assignee_id)));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_devices(devices: &[PushSubscription]) {
    if devices.is_empty() {
        println!("No devices registered.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Endpoint", "Registered"]);

    for device in devices {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(device.id)));
        row.add_cell(Cell::new(&device.endpoint));
        row.add_cell(Cell::new((device.created_at - Utc::now()).humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

fn marker_cell(date: Option<NaiveDate>) -> Cell {
    match date {
        Some(date) => Cell::new(date.to_string()),
        None => Cell::new("Never").fg(Color::DarkGrey),
    }
}
