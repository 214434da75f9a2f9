use anyhow::Result;
use clap::Subcommand;

use crate::platform::{access::GrantFileAccess, UsageAccess};

#[derive(Subcommand, Debug)]
pub enum PermissionCommand {
    #[command(about = "Show whether usage access is granted")]
    Check {},
    #[command(about = "Open the configured settings command to grant usage access")]
    Request {},
    #[command(about = "Grant usage access")]
    Grant {},
    #[command(about = "Revoke usage access")]
    Revoke {},
}

pub async fn process_permission_command(
    access: &GrantFileAccess,
    command: PermissionCommand,
) -> Result<()> {
    match command {
        PermissionCommand::Check {} => {
            if access.has_permission().await? {
                println!("granted");
            } else {
                println!("denied");
            }
        }
        PermissionCommand::Request {} => {
            if access.request_permission().await? {
                println!("Settings opened");
            } else {
                println!("Failed to open settings. Is --settings-command set?");
            }
        }
        PermissionCommand::Grant {} => access.grant().await?,
        PermissionCommand::Revoke {} => access.revoke().await?,
    }
    Ok(())
}
