//! The screen-analysis pipeline.
//!
//! [`AnalysisOrchestrator::analyze_screen`] drives one screenshot through
//!
//! ```text
//! Idle → ProjectLoaded → ContextRetrieved → Generated → Validated → Persisted
//! ```
//!
//! or into `Failed` from any state. Each stage calls exactly one collaborator
//! (the persist stage calls three, in order) and every call is bounded by the
//! configured timeout. Nothing is retried here; a failed run reports the
//! stage it stopped in and leaves completed side effects in place.
//!
//! Persistence order is image upload, then vector upsert, then screen append.
//! A failure after the upsert carries the id of the orphaned context
//! document so callers can reconcile by id.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqforge_core::error::{AnalysisError, PersistStep, Stage};
use reqforge_core::generation::GenerationClient;
use reqforge_core::models::{AnalysisResult, Project, Screen};
use reqforge_core::retrieve::ContextRetriever;
use reqforge_core::store::{ContextDocument, ImageStore, ProjectStore, VectorIndex};
use reqforge_core::{prompt, summary, validate};

use crate::config::RetrievalFailurePolicy;

/// Default bound on a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Input to one pipeline run.
#[derive(Debug, Clone)]
pub struct AnalyzeScreenRequest {
    pub image_bytes: Vec<u8>,
    pub mime_type: String,
    pub project_id: String,
    /// Free-text description used as the context query.
    pub screen_description: Option<String>,
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ProjectLoaded,
    ContextRetrieved,
    Generated,
    Validated,
    Persisted,
    Failed(Stage),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::ProjectLoaded => f.write_str("project_loaded"),
            PipelineState::ContextRetrieved => f.write_str("context_retrieved"),
            PipelineState::Generated => f.write_str("generated"),
            PipelineState::Validated => f.write_str("validated"),
            PipelineState::Persisted => f.write_str("persisted"),
            PipelineState::Failed(stage) => write!(f, "failed({})", stage),
        }
    }
}

/// Per-run state tracker; logs every transition.
struct Run<'a> {
    project_id: &'a str,
    state: PipelineState,
}

impl<'a> Run<'a> {
    fn new(project_id: &'a str) -> Self {
        Self {
            project_id,
            state: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        tracing::info!(project_id = %self.project_id, from = %self.state, to = %next, "pipeline transition");
        self.state = next;
    }

    fn fail(&mut self, err: AnalysisError) -> AnalysisError {
        let next = PipelineState::Failed(err.stage());
        tracing::warn!(
            project_id = %self.project_id,
            from = %self.state,
            to = %next,
            stage = %err.stage(),
            error = %err,
            "pipeline failed"
        );
        self.state = next;
        err
    }
}

/// Runs the analysis pipeline against injected collaborators.
///
/// Collaborators are shared, process-lifetime clients; the orchestrator keeps
/// no mutable state between runs, so one instance can serve concurrent runs.
pub struct AnalysisOrchestrator {
    projects: Arc<dyn ProjectStore>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn GenerationClient>,
    images: Arc<dyn ImageStore>,
    retriever: ContextRetriever,
    call_timeout: Duration,
    on_retrieval_failure: RetrievalFailurePolicy,
}

impl AnalysisOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationClient>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            retriever: ContextRetriever::new(index.clone()),
            projects,
            index,
            generator,
            images,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            on_retrieval_failure: RetrievalFailurePolicy::Abort,
        }
    }

    /// Replace the context retriever (for a different `k` or placeholder query).
    pub fn with_retriever(mut self, retriever: ContextRetriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_retrieval_failure_policy(mut self, policy: RetrievalFailurePolicy) -> Self {
        self.on_retrieval_failure = policy;
        self
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    /// Analyze one screenshot, persist the result, and return the analysis.
    ///
    /// # Errors
    ///
    /// Any [`AnalysisError`]; `project_id()` and `stage()` identify the run
    /// and the stage that failed.
    pub async fn analyze_screen(
        &self,
        request: AnalyzeScreenRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let project_id = request.project_id.as_str();
        let mut run = Run::new(project_id);

        let project = match self.load_project(project_id).await {
            Ok(project) => project,
            Err(e) => return Err(run.fail(e)),
        };
        run.advance(PipelineState::ProjectLoaded);

        let context = match self
            .retrieve_context(project_id, request.screen_description.as_deref())
            .await
        {
            Ok(context) => context,
            Err(e) => return Err(run.fail(e)),
        };
        tracing::debug!(project_id, documents = context.len(), "retrieved context");
        run.advance(PipelineState::ContextRetrieved);

        let generation_request =
            prompt::build(&project, &context, &request.image_bytes, &request.mime_type);
        let raw = match self.generate(project_id, &generation_request).await {
            Ok(raw) => raw,
            Err(e) => return Err(run.fail(e)),
        };
        run.advance(PipelineState::Generated);

        let analysis = match validate::validate(&raw) {
            Ok(analysis) => analysis,
            Err(violation) => {
                tracing::debug!(project_id, raw = %violation.raw, "rejected model output");
                return Err(run.fail(AnalysisError::SchemaViolation {
                    project_id: project_id.to_string(),
                    violation,
                }));
            }
        };
        run.advance(PipelineState::Validated);

        if let Err(e) = self.persist(&project, &request, &analysis).await {
            return Err(run.fail(e));
        }
        run.advance(PipelineState::Persisted);

        Ok(analysis)
    }

    /// Await `fut` for at most the configured call timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = T>,
    ) -> Result<T, tokio::time::error::Elapsed> {
        tokio::time::timeout(self.call_timeout, fut).await
    }

    fn timeout_error(&self, project_id: &str, stage: Stage) -> AnalysisError {
        AnalysisError::Timeout {
            project_id: project_id.to_string(),
            stage,
            after: self.call_timeout,
        }
    }

    async fn load_project(&self, project_id: &str) -> Result<Project, AnalysisError> {
        match self.bounded(self.projects.get_project(project_id)).await {
            Err(_) => Err(self.timeout_error(project_id, Stage::LoadProject)),
            Ok(Err(source)) => Err(AnalysisError::ProjectLookupFailed {
                project_id: project_id.to_string(),
                source,
            }),
            Ok(Ok(None)) => Err(AnalysisError::ProjectNotFound {
                project_id: project_id.to_string(),
            }),
            Ok(Ok(Some(project))) => Ok(project),
        }
    }

    async fn retrieve_context(
        &self,
        project_id: &str,
        description: Option<&str>,
    ) -> Result<Vec<String>, AnalysisError> {
        let result = match self
            .bounded(self.retriever.retrieve(project_id, description))
            .await
        {
            Ok(result) => result,
            Err(_) => return Err(self.timeout_error(project_id, Stage::RetrieveContext)),
        };

        match (result, self.on_retrieval_failure) {
            (Ok(context), _) => Ok(context),
            (Err(source), RetrievalFailurePolicy::EmptyContext) => {
                tracing::warn!(project_id, error = %source, "context retrieval failed, continuing without context");
                Ok(Vec::new())
            }
            (Err(source), RetrievalFailurePolicy::Abort) => {
                Err(AnalysisError::ContextRetrievalFailed {
                    project_id: project_id.to_string(),
                    source,
                })
            }
        }
    }

    async fn generate(
        &self,
        project_id: &str,
        request: &prompt::GenerationRequest,
    ) -> Result<String, AnalysisError> {
        tracing::debug!(project_id, model = %self.generator.model_name(), "calling generation backend");
        match self.bounded(self.generator.generate(request)).await {
            Err(_) => Err(self.timeout_error(project_id, Stage::Generate)),
            Ok(Err(e)) => Err(AnalysisError::from_generation(project_id, e)),
            Ok(Ok(raw)) => Ok(raw),
        }
    }

    /// Image upload, vector upsert, screen append; strictly in that order.
    async fn persist(
        &self,
        project: &Project,
        request: &AnalyzeScreenRequest,
        analysis: &AnalysisResult,
    ) -> Result<(), AnalysisError> {
        let project_id = project.id.as_str();
        let failed = |step: PersistStep, context_id: Option<&str>, source: anyhow::Error| {
            AnalysisError::PersistenceFailed {
                project_id: project_id.to_string(),
                step,
                context_id: context_id.map(str::to_string),
                source,
            }
        };
        let elapsed = |after: Duration| anyhow::anyhow!("timed out after {}s", after.as_secs());

        let image = self
            .bounded(self.images.put(&request.image_bytes, &request.mime_type))
            .await
            .unwrap_or_else(|_| Err(elapsed(self.call_timeout)))
            .map_err(|e| failed(PersistStep::ImageUpload, None, e))?;

        let document = ContextDocument::for_project(project_id, summary::project(analysis));
        let context_id = document.id.clone();
        self.bounded(self.index.upsert(&document))
            .await
            .unwrap_or_else(|_| Err(elapsed(self.call_timeout)))
            .map_err(|e| failed(PersistStep::VectorUpsert, Some(&context_id), e))?;
        tracing::info!(project_id, context_id = %context_id, "context document written");

        let screen_json = serde_json::to_string(analysis)
            .map_err(|e| failed(PersistStep::ScreenAppend, Some(&context_id), e.into()))?;
        let screen = Screen {
            id: uuid::Uuid::new_v4().to_string(),
            screen: screen_json,
            image,
            context_id: context_id.clone(),
        };

        self.bounded(self.projects.append_screen(project_id, &screen))
            .await
            .unwrap_or_else(|_| Err(elapsed(self.call_timeout)))
            .map_err(|e| failed(PersistStep::ScreenAppend, Some(&context_id), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Idle.to_string(), "idle");
        assert_eq!(
            PipelineState::Failed(Stage::Validate).to_string(),
            "failed(validate)"
        );
    }

    #[test]
    fn test_run_records_failure_stage() {
        let mut run = Run::new("p1");
        run.advance(PipelineState::ProjectLoaded);
        let err = run.fail(AnalysisError::ProjectNotFound {
            project_id: "p1".to_string(),
        });
        assert_eq!(run.state, PipelineState::Failed(Stage::LoadProject));
        assert_eq!(err.project_id(), "p1");
    }
}
