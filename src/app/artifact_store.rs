use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

/// Destination for finished archives.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct LocalDirSink {
    dir: PathBuf,
    force: bool,
}

impl LocalDirSink {
    pub fn new(dir: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            dir: dir.into(),
            force,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArchiveSink for LocalDirSink {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name == "."
            || file_name == ".."
        {
            anyhow::bail!("invalid archive file name: {file_name:?}");
        }

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create output dir: {}", self.dir.display()))?;

        let path = self.dir.join(file_name);
        if !self.force && fs::try_exists(&path).await.unwrap_or(false) {
            anyhow::bail!(
                "output file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }

        write_atomic(&path, bytes).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "archive saved");
        Ok(path)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp_path, bytes)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err).with_context(|| format!("rename tmp to final: {}", path.display()));
    }
    Ok(())
}
