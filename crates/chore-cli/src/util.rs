use anyhow::{anyhow, Result};
use chore_core::error::CoreError;
use chore_core::repository::Repository;
use uuid::Uuid;

/// Hex digits shown for IDs in tables.
pub const SHORT_ID_LEN: usize = 16;

pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..SHORT_ID_LEN].to_string()
}

pub async fn resolve_household_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    check_prefix(short_id)?;
    let households = repo.find_households_by_id_prefix(short_id).await?;
    pick("household", short_id, households.into_iter().map(|h| (h.id, h.name)).collect())
}

pub async fn resolve_member_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    check_prefix(short_id)?;
    let members = repo.find_members_by_id_prefix(short_id).await?;
    pick("member", short_id, members.into_iter().map(|m| (m.id, m.name)).collect())
}

pub async fn resolve_task_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    check_prefix(short_id)?;
    let tasks = repo.find_tasks_by_id_prefix(short_id).await?;
    pick("task", short_id, tasks.into_iter().map(|t| (t.id, t.title)).collect())
}

fn check_prefix(short_id: &str) -> Result<()> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    Ok(())
}

fn pick(entity: &str, short_id: &str, mut matches: Vec<(Uuid, String)>) -> Result<Uuid> {
    match matches.len() {
        0 => Err(anyhow!(CoreError::NotFound(format!(
            "No {} found with ID prefix '{}'",
            entity, short_id
        )))),
        1 => Ok(matches.remove(0).0),
        _ => Err(anyhow!(CoreError::AmbiguousId(
            matches.into_iter().map(|(id, name)| (id.to_string(), name)).collect()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        let id = Uuid::parse_str("0190f5d2-1c3a-7b4e-8d2f-123456789abc").unwrap();
        assert_eq!(short_id(id), "0190f5d21c3a7b4e");
    }

    #[test]
    fn test_pick() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        assert_eq!(pick("task", "01", vec![(a, "Bins".to_string())]).unwrap(), a);

        let none = pick("task", "ff", vec![]).unwrap_err();
        assert!(matches!(none.downcast_ref::<CoreError>(), Some(CoreError::NotFound(_))));

        let both = pick("task", "01", vec![(a, "Bins".to_string()), (b, "Dishes".to_string())]).unwrap_err();
        match both.downcast_ref::<CoreError>() {
            Some(CoreError::AmbiguousId(candidates)) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }
}
