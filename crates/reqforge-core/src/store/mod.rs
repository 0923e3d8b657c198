//! Collaborator abstractions for reqforge.
//!
//! The pipeline talks to three external stores through these traits:
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`VectorIndex`] | Write-once context documents, filtered similarity query |
//! | [`ProjectStore`] | Load a project, append a screen to it |
//! | [`ImageStore`] | Persist screenshot bytes, return a stable reference |
//!
//! All operations are async (via `async-trait`) and report failures as
//! `anyhow::Error`; the pipeline classifies them. Implementations must be
//! `Send + Sync` so one instance can be shared across concurrent runs.
//! In-memory implementations live in [`memory`].

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ImageRef, Project, Screen};

/// Metadata stored alongside a context document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "projectId")]
    pub project_id: String,
}

/// A vector-index entry: the summary of one analyzed screen.
///
/// The embedding is computed by the index from `document` on upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub id: String,
    pub document: String,
    pub metadata: DocumentMetadata,
}

impl ContextDocument {
    /// Build a document for `project_id` with id
    /// `analysis-{project_id}-{millis}-{suffix}`.
    ///
    /// The random suffix keeps ids unique when two runs for the same project
    /// finish within the same millisecond.
    pub fn for_project(project_id: &str, document: String) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("analysis-{}-{}-{}", project_id, millis, &suffix[..8]),
            document,
            metadata: DocumentMetadata {
                project_id: project_id.to_string(),
            },
        }
    }
}

/// Equality filter on document metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub project_id: String,
}

impl MetadataFilter {
    pub fn project(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
        }
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        metadata.project_id == self.project_id
    }
}

/// A document returned from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub id: String,
    pub document: String,
    /// Distance from the query (lower is closer), as reported by the index.
    pub distance: f32,
}

/// A remote vector collection holding context documents.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store a document. Ids are unique; documents are never
    /// updated in place by the pipeline.
    async fn upsert(&self, doc: &ContextDocument) -> Result<()>;

    /// Return at most `k` documents matching `filter`, closest to `text`
    /// first. An index with no matching documents yields an empty vec.
    async fn query(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> Result<Vec<RankedDocument>>;
}

/// The project/screen persistence collaborator.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project with its screens in upload order.
    async fn get_project(&self, id: &str) -> Result<Option<Project>>;

    /// Append a screen to the end of a project's screen list and return the
    /// updated project. Fails if the project does not exist.
    async fn append_screen(&self, project_id: &str, screen: &Screen) -> Result<Project>;
}

/// Object storage for screenshot bytes.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, bytes: &[u8], mime_type: &str) -> Result<ImageRef>;
}

/// File extension for a screenshot MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "bin",
    }
}

/// Content identifier for image bytes: lowercase hex SHA-256.
pub fn content_id(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}
