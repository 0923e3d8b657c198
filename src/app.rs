//! Composition root.
//!
//! [`App::build`] turns a [`Config`] into the process-lifetime collaborators
//! (SQLite project store, filesystem image store, vector index, Gemini
//! client) and wires them into an [`AnalysisOrchestrator`]. The CLI commands
//! below are thin wrappers around it.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqforge_core::embedding::{EmbeddingProvider, HashEmbedder};
use reqforge_core::models::{AnalysisResult, Project};
use reqforge_core::retrieve::ContextRetriever;
use reqforge_core::store::memory::InMemoryVectorIndex;
use reqforge_core::store::{ProjectStore, VectorIndex};

use crate::chroma::ChromaIndex;
use crate::config::Config;
use crate::embedding::{create_provider, gemini_api_key};
use crate::gemini::GeminiClient;
use crate::image_store::FsImageStore;
use crate::pipeline::{AnalysisOrchestrator, AnalyzeScreenRequest};
use crate::project_store::{ProjectSummary, SqliteProjectStore};
use crate::{db, migrate};

pub struct App {
    pub projects: Arc<SqliteProjectStore>,
    pub orchestrator: AnalysisOrchestrator,
}

impl App {
    /// Connect every collaborator described by `config`.
    ///
    /// The database schema is created if missing.
    pub async fn build(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        let projects = Arc::new(SqliteProjectStore::new(pool));

        let index = build_index(config).await?;

        let api_key = gemini_api_key()?;
        let generator = Arc::new(GeminiClient::new(&config.generation, api_key)?);
        let images = Arc::new(FsImageStore::new(&config.images.root));

        let retriever = ContextRetriever::new(index.clone())
            .with_k(config.retrieval.k)
            .with_default_query(config.retrieval.default_query.clone());

        let orchestrator = AnalysisOrchestrator::new(projects.clone(), index, generator, images)
            .with_retriever(retriever)
            .with_call_timeout(Duration::from_secs(config.pipeline.call_timeout_secs))
            .with_retrieval_failure_policy(config.retrieval.on_failure);

        tracing::debug!(
            model = %config.generation.model,
            vector_backend = %config.vector.backend,
            embedding = %config.embedding.provider,
            "app ready"
        );

        Ok(Self {
            projects,
            orchestrator,
        })
    }
}

/// Vector index for the configured backend.
///
/// The memory backend falls back to [`HashEmbedder`] when no embedding
/// provider is configured; it does not survive the process.
pub async fn build_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    let embedder: Arc<dyn EmbeddingProvider> = if config.embedding.is_enabled() {
        create_provider(&config.embedding)?
    } else {
        Arc::new(HashEmbedder::default())
    };

    match config.vector.backend.as_str() {
        "memory" => {
            tracing::warn!("using in-memory vector index; context is lost on exit");
            Ok(Arc::new(InMemoryVectorIndex::new(embedder)))
        }
        _ => Ok(Arc::new(ChromaIndex::connect(&config.vector, embedder).await?)),
    }
}

/// `reqforge init`
pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("Database initialized at {}", config.db.path.display());
    Ok(())
}

async fn project_store(config: &Config) -> Result<SqliteProjectStore> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    Ok(SqliteProjectStore::new(pool))
}

/// `reqforge project create`
pub async fn create_project(config: &Config, name: &str, description: &str) -> Result<Project> {
    let store = project_store(config).await?;
    let project = store.create_project(name, description).await?;
    println!("{}", project.id);
    Ok(project)
}

/// `reqforge project list`
pub async fn list_projects(config: &Config) -> Result<Vec<ProjectSummary>> {
    let store = project_store(config).await?;
    let projects = store.list_projects().await?;

    if projects.is_empty() {
        println!("No projects.");
    }
    for p in &projects {
        println!(
            "{}  {:<30}  {} screen(s)  {}",
            p.id, p.name, p.screen_count, p.created_at
        );
    }
    Ok(projects)
}

/// `reqforge project show`
pub async fn show_project(config: &Config, id: &str) -> Result<()> {
    let store = project_store(config).await?;
    let project = store
        .get_project(id)
        .await?
        .with_context(|| format!("project not found: {}", id))?;
    println!("{}", serde_json::to_string_pretty(&project)?);
    Ok(())
}

/// `reqforge analyze`
pub async fn analyze(
    config: &Config,
    project_id: &str,
    image_path: &Path,
    description: Option<String>,
    mime_type: Option<String>,
) -> Result<AnalysisResult> {
    let image_bytes = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read image: {}", image_path.display()))?;
    let mime_type = match mime_type {
        Some(m) => m,
        None => mime_from_path(image_path)?.to_string(),
    };

    let app = App::build(config).await?;
    let analysis = app
        .orchestrator
        .analyze_screen(AnalyzeScreenRequest {
            image_bytes,
            mime_type,
            project_id: project_id.to_string(),
            screen_description: description,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(analysis)
}

/// `reqforge context`
pub async fn show_context(config: &Config, project_id: &str, query: Option<&str>) -> Result<()> {
    let index = build_index(config).await?;
    let retriever = ContextRetriever::new(index)
        .with_k(config.retrieval.k)
        .with_default_query(config.retrieval.default_query.clone());

    let documents = retriever.retrieve(project_id, query).await?;
    if documents.is_empty() {
        println!("No context documents for project {}.", project_id);
    }
    for (i, doc) in documents.iter().enumerate() {
        println!("--- [{}] ---\n{}", i + 1, doc);
    }
    Ok(())
}

/// Guess a screenshot MIME type from its file extension.
pub fn mime_from_path(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "heic" => Ok("image/heic"),
        _ => anyhow::bail!(
            "cannot infer image type from '{}'; pass --mime",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path(&PathBuf::from("a/Login.PNG")).unwrap(), "image/png");
        assert_eq!(mime_from_path(&PathBuf::from("b.jpeg")).unwrap(), "image/jpeg");
        assert!(mime_from_path(&PathBuf::from("notes.txt")).is_err());
    }
}
