//! In-memory collaborator implementations for testing and offline runs.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Vector queries are brute-force cosine similarity over all stored vectors
//! of the filtered project.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::{embed_one, EmbeddingProvider};
use crate::models::{ImageRef, Project, Screen};

use super::{
    content_id, ContextDocument, ImageStore, MetadataFilter, ProjectStore, RankedDocument,
    VectorIndex,
};

struct StoredVector {
    doc: ContextDocument,
    vector: Vec<f32>,
}

/// In-memory vector index; embeddings come from the injected provider.
pub struct InMemoryVectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: RwLock<Vec<StoredVector>>,
}

impl InMemoryVectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            vectors: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents across all projects.
    pub fn len(&self) -> usize {
        self.vectors.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored documents, in insertion order.
    pub fn documents(&self) -> Vec<ContextDocument> {
        self.vectors
            .read()
            .unwrap()
            .iter()
            .map(|sv| sv.doc.clone())
            .collect()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, doc: &ContextDocument) -> Result<()> {
        let vector = embed_one(self.embedder.as_ref(), &doc.document).await?;
        let mut vecs = self.vectors.write().unwrap();
        vecs.retain(|sv| sv.doc.id != doc.id);
        vecs.push(StoredVector {
            doc: doc.clone(),
            vector,
        });
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> Result<Vec<RankedDocument>> {
        let query_vec = embed_one(self.embedder.as_ref(), text).await?;
        let vecs = self.vectors.read().unwrap();
        let mut ranked: Vec<RankedDocument> = vecs
            .iter()
            .filter(|sv| filter.matches(&sv.doc.metadata))
            .map(|sv| RankedDocument {
                id: sv.doc.id.clone(),
                document: sv.doc.document.clone(),
                distance: 1.0 - crate::embedding::cosine_similarity(&query_vec, &sv.vector),
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        ranked.truncate(k);
        Ok(ranked)
    }
}

/// In-memory project store.
#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<String, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty project and return it.
    pub fn create_project(&self, name: &str, description: &str) -> Project {
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            screens: Vec::new(),
        };
        self.insert(project.clone());
        project
    }

    /// Insert or replace a project as-is.
    pub fn insert(&self, project: Project) {
        self.projects
            .write()
            .unwrap()
            .insert(project.id.clone(), project);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.projects.read().unwrap().get(id).cloned())
    }

    async fn append_screen(&self, project_id: &str, screen: &Screen) -> Result<Project> {
        let mut projects = self.projects.write().unwrap();
        match projects.get_mut(project_id) {
            Some(project) => {
                project.screens.push(screen.clone());
                Ok(project.clone())
            }
            None => bail!("project not found: {}", project_id),
        }
    }
}

/// In-memory image store keyed by content hash.
#[derive(Default)]
pub struct InMemoryImageStore {
    images: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<Vec<u8>> {
        self.images.read().unwrap().get(identifier).cloned()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn put(&self, bytes: &[u8], mime_type: &str) -> Result<ImageRef> {
        let identifier = content_id(bytes);
        self.images
            .write()
            .unwrap()
            .insert(identifier.clone(), bytes.to_vec());
        Ok(ImageRef {
            url: format!(
                "memory://images/{}.{}",
                identifier,
                super::extension_for_mime(mime_type)
            ),
            identifier,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    fn doc(id: &str, project: &str, text: &str) -> ContextDocument {
        ContextDocument {
            id: id.to_string(),
            document: text.to_string(),
            metadata: super::super::DocumentMetadata {
                project_id: project.to_string(),
            },
        }
    }

    fn index() -> InMemoryVectorIndex {
        InMemoryVectorIndex::new(Arc::new(HashEmbedder::default()))
    }

    #[tokio::test]
    async fn test_query_empty_index() {
        let idx = index();
        let res = idx
            .query("anything", &MetadataFilter::project("p1"), 3)
            .await
            .unwrap();
        assert!(res.is_empty());
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let idx = index();
        idx.upsert(&doc("a", "p1", "monthly revenue chart"))
            .await
            .unwrap();
        idx.upsert(&doc("b", "p1", "login form with email and password"))
            .await
            .unwrap();
        let res = idx
            .query("email password login", &MetadataFilter::project("p1"), 2)
            .await
            .unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].id, "b");
        assert!(res[0].distance <= res[1].distance);
    }

    #[tokio::test]
    async fn test_query_filters_by_project() {
        let idx = index();
        idx.upsert(&doc("a", "p1", "login form")).await.unwrap();
        idx.upsert(&doc("b", "p2", "login form")).await.unwrap();
        let res = idx
            .query("login form", &MetadataFilter::project("p2"), 5)
            .await
            .unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].id, "b");
    }

    #[tokio::test]
    async fn test_query_truncates_to_k() {
        let idx = index();
        for i in 0..5 {
            idx.upsert(&doc(&format!("d{}", i), "p1", "screen"))
                .await
                .unwrap();
        }
        let res = idx
            .query("screen", &MetadataFilter::project("p1"), 2)
            .await
            .unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(idx.len(), 5);
    }

    #[tokio::test]
    async fn test_append_screen_preserves_order() {
        let store = InMemoryProjectStore::new();
        let project = store.create_project("App", "Desc");
        for i in 0..3 {
            let screen = Screen {
                id: format!("s{}", i),
                screen: "{}".to_string(),
                image: ImageRef {
                    identifier: String::new(),
                    url: String::new(),
                    created_at: String::new(),
                },
                context_id: String::new(),
            };
            store.append_screen(&project.id, &screen).await.unwrap();
        }
        let loaded = store.get_project(&project.id).await.unwrap().unwrap();
        let ids: Vec<&str> = loaded.screens.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
    }

    #[tokio::test]
    async fn test_append_screen_unknown_project() {
        let store = InMemoryProjectStore::new();
        let screen = Screen {
            id: "s".to_string(),
            screen: "{}".to_string(),
            image: ImageRef {
                identifier: String::new(),
                url: String::new(),
                created_at: String::new(),
            },
            context_id: String::new(),
        };
        assert!(store.append_screen("missing", &screen).await.is_err());
    }

    #[tokio::test]
    async fn test_image_store_content_addressed() {
        let images = InMemoryImageStore::new();
        let a = images.put(b"png-bytes", "image/png").await.unwrap();
        let b = images.put(b"png-bytes", "image/png").await.unwrap();
        assert_eq!(a.identifier, b.identifier);
        assert!(a.url.ends_with(".png"));
        assert_eq!(images.get(&a.identifier).unwrap(), b"png-bytes".to_vec());
    }
}
