use crate::adapters::FileStorage;
use crate::models::{IncomingFile, UploadedFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File storage backed by a directory under the app data dir. Attachment
/// bytes arrive as base64 data URLs and are written to
/// `<data_dir>/uploads/<uuid>.<ext>`.
pub struct LocalFileStorage {
    uploads_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            uploads_dir: data_dir.join("uploads"),
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, file: &IncomingFile) -> Result<UploadedFile> {
        let payload = file
            .data_url
            .split_once(',')
            .map(|(_, payload)| payload)
            .context("attachment content is not a data URL")?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .context("attachment content is not valid base64")?;

        let file_name = match file.name.rsplit_once('.') {
            Some((_, extension)) => format!("{}.{}", Uuid::new_v4(), extension.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let target = self.uploads_dir.join(file_name);

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .with_context(|| format!("creating {}", self.uploads_dir.display()))?;
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        Ok(UploadedFile {
            file_url: format!("file://{}", target.display()),
        })
    }
}
