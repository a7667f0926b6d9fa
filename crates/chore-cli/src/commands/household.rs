use anyhow::Result;
use chore_core::repository::Repository;

use crate::cli::{HouseholdCommand, HouseholdSubcommand};
use crate::config::Config;
use crate::views::table::display_households;

pub async fn household_command(repo: &impl Repository, command: HouseholdCommand, config: &Config) -> Result<()> {
    match command.command {
        HouseholdSubcommand::Add { name, timezone } => {
            let timezone = timezone.unwrap_or_else(|| config.default_timezone.clone());
            let household = repo.add_household(name, timezone).await?;
            println!(
                "Added household '{}' ({}) with ID {}",
                household.name, household.timezone, household.id
            );
            Ok(())
        }
        HouseholdSubcommand::List => {
            let households = repo.find_households().await?;
            display_households(&households);
            Ok(())
        }
    }
}
