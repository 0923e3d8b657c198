//! Filesystem image store.
//!
//! Screenshots are written under `images.root` as `{sha256}.{ext}`, so
//! uploading the same bytes twice yields the same reference.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use reqforge_core::models::ImageRef;
use reqforge_core::store::{content_id, extension_for_mime, ImageStore};

pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(&self, bytes: &[u8], mime_type: &str) -> Result<ImageRef> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create image directory: {}", self.root.display()))?;

        let identifier = content_id(bytes);
        let path = self
            .root
            .join(format!("{}.{}", identifier, extension_for_mime(mime_type)));

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write image: {}", path.display()))?;

        let absolute = tokio::fs::canonicalize(&path).await.unwrap_or(path);

        Ok(ImageRef {
            identifier,
            url: format!("file://{}", absolute.display()),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
    }
}
