use anyhow::Result;
use chore_core::repository::Repository;

use crate::cli::{MemberCommand, MemberSubcommand};
use crate::util::resolve_household_id;
use crate::views::table::display_members;

pub async fn member_command(repo: &impl Repository, command: MemberCommand) -> Result<()> {
    match command.command {
        MemberSubcommand::Add { household, name } => {
            let household_id = resolve_household_id(repo, &household).await?;
            let member = repo.add_member(household_id, name).await?;
            println!("Added member '{}' with ID {}", member.name, member.id);
            Ok(())
        }
        MemberSubcommand::List { household } => {
            let household_id = resolve_household_id(repo, &household).await?;
            let members = repo.find_members_by_household(household_id).await?;
            display_members(&members);
            Ok(())
        }
    }
}
