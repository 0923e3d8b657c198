//! Chroma vector index over the v2 HTTP API.
//!
//! The collection is resolved once with `get_or_create` when the index is
//! built; afterwards every [`VectorIndex`] call is a single `add` or `query`
//! request against that collection id. Embeddings are computed client-side
//! by the injected [`EmbeddingProvider`], so the collection never needs a
//! server-side embedding function.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use reqforge_core::embedding::{embed_one, EmbeddingProvider};
use reqforge_core::store::{ContextDocument, MetadataFilter, RankedDocument, VectorIndex};

use crate::config::VectorConfig;

pub struct ChromaIndex {
    client: Client,
    collection_url: String,
    api_key: Option<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl ChromaIndex {
    /// Resolve (creating if needed) the configured collection.
    ///
    /// The API token is read from `CHROMA_API_KEY` when set.
    pub async fn connect(config: &VectorConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let api_key = std::env::var("CHROMA_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::connect_with_key(config, embedder, api_key).await
    }

    pub async fn connect_with_key(
        config: &VectorConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let collections_url = format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            config.url.trim_end_matches('/'),
            config.tenant,
            config.database
        );

        let mut request = client.post(&collections_url).json(&serde_json::json!({
            "name": config.collection,
            "get_or_create": true,
        }));
        if let Some(key) = &api_key {
            request = request.header("x-chroma-token", key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach Chroma at {}", config.url))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Chroma get_or_create collection failed {}: {}", status, body);
        }
        let collection: CollectionResponse = response
            .json()
            .await
            .context("Invalid Chroma collection response")?;

        tracing::debug!(collection = %config.collection, id = %collection.id, "resolved Chroma collection");

        Ok(Self {
            client,
            collection_url: format!("{}/{}", collections_url, collection.id),
            api_key,
            embedder,
        })
    }

    async fn post(&self, action: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.collection_url, action))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("x-chroma-token", key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Chroma {} request failed", action))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Chroma {} error {}: {}", action, status, text);
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn upsert(&self, doc: &ContextDocument) -> Result<()> {
        let embedding = embed_one(self.embedder.as_ref(), &doc.document).await?;
        let body = serde_json::json!({
            "ids": [doc.id],
            "embeddings": [embedding],
            "documents": [doc.document],
            "metadatas": [doc.metadata],
        });
        self.post("add", &body).await?;
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        filter: &MetadataFilter,
        k: usize,
    ) -> Result<Vec<RankedDocument>> {
        let embedding = embed_one(self.embedder.as_ref(), text).await?;
        let body = serde_json::json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "where": { "projectId": filter.project_id },
            "include": ["documents", "distances"],
        });

        let parsed: QueryResponse = self
            .post("query", &body)
            .await?
            .json()
            .await
            .context("Invalid Chroma query response")?;

        Ok(ranked_documents(parsed))
    }
}

/// Flatten the first query row; entries without a document are skipped.
fn ranked_documents(response: QueryResponse) -> Vec<RankedDocument> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let document = documents.get(i).cloned().flatten()?;
            let distance = distances.get(i).copied().flatten().unwrap_or(f32::MAX);
            Some(RankedDocument {
                id,
                document,
                distance,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ranked_documents_flattens_first_row() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["a", "b", "c"]],
            "documents": [["doc a", null, "doc c"]],
            "distances": [[0.1, 0.2, 0.3]]
        }))
        .unwrap();
        let ranked = ranked_documents(response);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].document, "doc c");
        assert!((ranked[1].distance - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_ranked_documents_empty_result() {
        let response: QueryResponse =
            serde_json::from_value(json!({ "ids": [[]], "documents": [[]] })).unwrap();
        assert!(ranked_documents(response).is_empty());
    }
}
