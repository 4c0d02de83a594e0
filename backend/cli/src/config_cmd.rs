//! `pagesight config`: show the effective config or write a starter file.

use std::path::Path;

use anyhow::{bail, Result};
use pagesight_config::{apply_all_defaults, redact_config, write_config, PageSightConfig};

use crate::terminal_output::{note, Tone};

pub fn show(config: &PageSightConfig) -> Result<()> {
    let redacted = redact_config(config);
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

/// Write every default to `path`. Refuses to replace an existing file unless `force`.
pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let starter = apply_all_defaults(PageSightConfig::default());
    write_config(&starter, path).await?;
    note(Tone::Success, &format!("wrote {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        init(&path, false).await.unwrap();
        assert!(init(&path, false).await.is_err());
        init(&path, true).await.unwrap();
    }

    #[tokio::test]
    async fn starter_file_loads_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        init(&path, false).await.unwrap();
        let loaded = pagesight_config::load_and_prepare(&path).await.unwrap();
        assert_eq!(loaded, apply_all_defaults(PageSightConfig::default()));
    }
}
