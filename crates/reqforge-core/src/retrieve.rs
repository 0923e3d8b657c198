//! Retrieval of prior-screen context for a project.
//!
//! The retriever asks the [`VectorIndex`] for the `k` summaries of the same
//! project closest to the new screen's description. Without a description a
//! generic placeholder query is used, which surfaces the most central prior
//! screens. The query is always filtered on the project id.

use std::sync::Arc;

use anyhow::Result;

use crate::store::{MetadataFilter, VectorIndex};

/// Placeholder query used when no screen description is supplied.
pub const DEFAULT_QUERY: &str = "screenName";

/// Default number of context documents retrieved per analysis.
pub const DEFAULT_K: usize = 3;

/// Fetches prior-screen summaries for a project.
pub struct ContextRetriever {
    index: Arc<dyn VectorIndex>,
    k: usize,
    default_query: String,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            k: DEFAULT_K,
            default_query: DEFAULT_QUERY.to_string(),
        }
    }

    /// Override the number of documents returned.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Override the placeholder query.
    pub fn with_default_query(mut self, query: impl Into<String>) -> Self {
        self.default_query = query.into();
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Return at most `k` summaries for `project_id`, most relevant first.
    ///
    /// A blank or absent `query_text` falls back to the placeholder query.
    /// A project with no indexed screens yields an empty vec.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying index.
    pub async fn retrieve(&self, project_id: &str, query_text: Option<&str>) -> Result<Vec<String>> {
        let query = query_text
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(self.default_query.as_str());

        let ranked = self
            .index
            .query(query, &MetadataFilter::project(project_id), self.k)
            .await?;

        Ok(ranked.into_iter().take(self.k).map(|r| r.document).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::store::memory::InMemoryVectorIndex;
    use crate::store::{ContextDocument, RankedDocument};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn memory_index() -> Arc<InMemoryVectorIndex> {
        Arc::new(InMemoryVectorIndex::new(Arc::new(HashEmbedder::default())))
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let retriever = ContextRetriever::new(memory_index());
        let docs = retriever.retrieve("p1", Some("login form")).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_returns_at_most_k() {
        let index = memory_index();
        for i in 0..5 {
            index
                .upsert(&ContextDocument::for_project("p1", format!("Screen: {}", i)))
                .await
                .unwrap();
        }
        let retriever = ContextRetriever::new(index).with_k(2);
        let docs = retriever.retrieve("p1", None).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_never_leaks_other_projects() {
        let index = memory_index();
        index
            .upsert(&ContextDocument::for_project("p2", "Screen: Login".to_string()))
            .await
            .unwrap();
        let retriever = ContextRetriever::new(index);
        let docs = retriever.retrieve("p1", Some("Login")).await.unwrap();
        assert!(docs.is_empty());
    }

    /// Records the query text it receives.
    struct RecordingIndex {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(&self, _doc: &ContextDocument) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            text: &str,
            filter: &MetadataFilter,
            _k: usize,
        ) -> Result<Vec<RankedDocument>> {
            assert_eq!(filter.project_id, "p1");
            self.queries.lock().unwrap().push(text.to_string());
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_placeholder_query_without_description() {
        let index = Arc::new(RecordingIndex {
            queries: Mutex::new(Vec::new()),
        });
        let retriever = ContextRetriever::new(index.clone());
        retriever.retrieve("p1", None).await.unwrap();
        retriever.retrieve("p1", Some("   ")).await.unwrap();
        retriever.retrieve("p1", Some("dashboard")).await.unwrap();
        assert_eq!(
            *index.queries.lock().unwrap(),
            vec!["screenName", "screenName", "dashboard"]
        );
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn upsert(&self, _doc: &ContextDocument) -> Result<()> {
            anyhow::bail!("unreachable")
        }

        async fn query(
            &self,
            _text: &str,
            _filter: &MetadataFilter,
            _k: usize,
        ) -> Result<Vec<RankedDocument>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let retriever = ContextRetriever::new(Arc::new(FailingIndex));
        let err = retriever.retrieve("p1", None).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
