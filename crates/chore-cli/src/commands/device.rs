use anyhow::Result;
use chore_core::models::NewSubscriptionData;
use chore_core::repository::Repository;

use crate::cli::{DeviceCommand, DeviceSubcommand};
use crate::util::resolve_member_id;
use crate::views::table::display_devices;

pub async fn device_command(repo: &impl Repository, command: DeviceCommand) -> Result<()> {
    match command.command {
        DeviceSubcommand::Add { member, endpoint, p256dh, auth } => {
            let member_id = resolve_member_id(repo, &member).await?;
            let subscription = repo
                .add_subscription(NewSubscriptionData { member_id, endpoint, p256dh, auth })
                .await?;
            println!("Registered device with ID {}", subscription.id);
            Ok(())
        }
        DeviceSubcommand::List { member } => {
            let member_id = resolve_member_id(repo, &member).await?;
            let devices = repo.find_subscriptions_for_member(member_id).await?;
            display_devices(&devices);
            Ok(())
        }
    }
}
