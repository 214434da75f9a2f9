use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::UsageAccess;

pub const GRANT_FILE: &str = "usage-access";

/// Usage access represented by a marker file in the application directory. Granting and revoking
/// is done by whatever the settings command opens (or directly through the cli).
pub struct GrantFileAccess {
    grant_path: PathBuf,
    settings_command: Option<String>,
}

impl GrantFileAccess {
    pub fn new(app_dir: &Path, settings_command: Option<String>) -> Self {
        Self {
            grant_path: app_dir.join(GRANT_FILE),
            settings_command,
        }
    }

    pub async fn grant(&self) -> Result<()> {
        tokio::fs::write(&self.grant_path, b"").await?;
        info!("Usage access granted");
        Ok(())
    }

    pub async fn revoke(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.grant_path).await {
            Ok(_) => {
                info!("Usage access revoked");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Spawns the settings command in its own process group. The returned task reaps it once
    /// it exits, so a long running process doesn't collect zombies.
    fn launch_settings(command_line: &str) -> Result<JoinHandle<io::Result<ExitStatus>>> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("Settings command is empty"))?;
        let mut command = tokio::process::Command::new(program);
        command.args(parts);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let mut child = command.spawn()?;
        Ok(tokio::spawn(async move {
            let status = child.wait().await;
            debug!("Settings command finished with {status:?}");
            status
        }))
    }
}

#[async_trait]
impl UsageAccess for GrantFileAccess {
    async fn has_permission(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.grant_path).await?)
    }

    async fn request_permission(&self) -> Result<bool> {
        let Some(command_line) = self.settings_command.as_deref() else {
            warn!("No settings command configured, can't request usage access");
            return Ok(false);
        };

        match Self::launch_settings(command_line) {
            Ok(_) => {
                info!("Launched settings command {command_line}");
                Ok(true)
            }
            Err(e) => {
                error!("Failed to launch settings command {command_line}: {e:?}");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::platform::UsageAccess;

    use super::GrantFileAccess;

    #[tokio::test]
    async fn test_grant_and_revoke() -> Result<()> {
        let dir = tempdir()?;
        let access = GrantFileAccess::new(dir.path(), None);

        assert!(!access.has_permission().await?);
        access.grant().await?;
        assert!(access.has_permission().await?);
        access.revoke().await?;
        assert!(!access.has_permission().await?);
        // Revoking twice is fine.
        access.revoke().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_request_without_command() -> Result<()> {
        let dir = tempdir()?;
        let access = GrantFileAccess::new(dir.path(), None);
        assert!(!access.request_permission().await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_with_missing_program() -> Result<()> {
        let dir = tempdir()?;
        let access = GrantFileAccess::new(
            dir.path(),
            Some("definitely-not-an-existing-settings-program --open".into()),
        );
        assert!(!access.request_permission().await?);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_request_launches_command() -> Result<()> {
        let dir = tempdir()?;
        let access = GrantFileAccess::new(dir.path(), Some("true".into()));
        assert!(access.request_permission().await?);
        // Launching says nothing about the grant.
        assert!(!access.has_permission().await?);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launched_command_is_reaped() -> Result<()> {
        let status = GrantFileAccess::launch_settings("true --ignored")?.await??;
        assert!(status.success());

        let status = GrantFileAccess::launch_settings("false")?.await??;
        assert!(!status.success());
        Ok(())
    }

    #[test]
    fn test_empty_settings_command() {
        assert!(GrantFileAccess::launch_settings("   ").is_err());
    }
}
