use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{LabelError, LabelResolver};

pub const LABELS_FILE: &str = "labels.json";

/// Application labels stored as a json object of `identifier -> name`.
pub struct LabelCatalog {
    path: PathBuf,
}

impl LabelCatalog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, LabelError> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No label catalog at {:?}", self.path);
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                return Err(LabelError::Catalog {
                    message: format!("{:?}: {e}", self.path),
                })
            }
        };
        serde_json::from_slice(&content).map_err(|e| LabelError::Catalog {
            message: format!("{:?}: {e}", self.path),
        })
    }

    /// Adds or replaces a label.
    pub async fn set_label(&self, application_id: &str, name: &str) -> Result<()> {
        let mut labels = self.load().await?;
        labels.insert(application_id.to_owned(), name.to_owned());
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&labels)?).await?;
        Ok(())
    }
}

#[async_trait]
impl LabelResolver for LabelCatalog {
    async fn resolve_label(&self, application_id: &str) -> Result<String, LabelError> {
        self.load()
            .await?
            .remove(application_id)
            .ok_or_else(|| LabelError::NotFound(application_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::platform::{LabelError, LabelResolver};

    use super::{LabelCatalog, LABELS_FILE};

    #[tokio::test]
    async fn test_set_and_resolve() -> Result<()> {
        let dir = tempdir()?;
        let catalog = LabelCatalog::new(dir.path().join(LABELS_FILE));
        catalog.set_label("org.mozilla.firefox", "Firefox").await?;
        catalog.set_label("org.gnome.Nautilus", "Files").await?;
        catalog.set_label("org.mozilla.firefox", "Firefox Nightly").await?;

        assert_eq!(
            catalog.resolve_label("org.mozilla.firefox").await?,
            "Firefox Nightly"
        );
        assert_eq!(catalog.resolve_label("org.gnome.Nautilus").await?, "Files");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_label() -> Result<()> {
        let dir = tempdir()?;
        let catalog = LabelCatalog::new(dir.path().join(LABELS_FILE));
        assert_eq!(
            catalog.resolve_label("uninstalled").await,
            Err(LabelError::NotFound("uninstalled".into()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_broken_catalog() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LABELS_FILE);
        std::fs::write(&path, "not json")?;
        let catalog = LabelCatalog::new(path);
        assert!(matches!(
            catalog.resolve_label("anything").await,
            Err(LabelError::Catalog { .. })
        ));
        Ok(())
    }
}
