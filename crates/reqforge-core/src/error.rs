//! Error taxonomy of the screen-analysis pipeline.
//!
//! Collaborators (stores, indexes, embedding providers) report failures as
//! `anyhow::Error`; the pipeline classifies them into [`AnalysisError`] so
//! that callers can tell a user-correctable problem (an unknown project) from
//! a provider outage or a malformed model response.

use std::fmt;
use std::time::Duration;

/// The model produced output that does not match the analysis schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema violation at '{path}': {reason}")]
pub struct SchemaViolation {
    /// JSON-pointer-style location of the problem (`""` when the text did not
    /// parse at all).
    pub path: String,
    pub reason: String,
    /// The raw model output, kept for diagnostics.
    pub raw: String,
}

/// Failure of the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Transport failure, non-success status or undecodable provider response.
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),
    /// The provider returned no candidates or blocked the request.
    #[error("generation refused by provider: {0}")]
    Refused(String),
}

/// Pipeline stage, used to attribute failures and in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadProject,
    RetrieveContext,
    Generate,
    Validate,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadProject => "load_project",
            Stage::RetrieveContext => "retrieve_context",
            Stage::Generate => "generate",
            Stage::Validate => "validate",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// The write that failed while persisting a validated analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStep {
    ImageUpload,
    VectorUpsert,
    ScreenAppend,
}

impl fmt::Display for PersistStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistStep::ImageUpload => "image upload",
            PersistStep::VectorUpsert => "vector upsert",
            PersistStep::ScreenAppend => "screen append",
        };
        f.write_str(name)
    }
}

/// Every way an `analyze_screen` run can fail.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("failed to load project {project_id}: {source}")]
    ProjectLookupFailed {
        project_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("context retrieval failed for project {project_id}: {source}")]
    ContextRetrievalFailed {
        project_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("generation unavailable for project {project_id}: {message}")]
    GenerationUnavailable { project_id: String, message: String },

    #[error("generation refused for project {project_id}: {reason}")]
    GenerationRefused { project_id: String, reason: String },

    #[error("invalid analysis for project {project_id}: {violation}")]
    SchemaViolation {
        project_id: String,
        #[source]
        violation: SchemaViolation,
    },

    /// A write failed after validation succeeded. `context_id` is set once the
    /// context document id is known: after a failed or timed-out upsert the
    /// index may hold that document, after a failed append it does.
    #[error("persistence failed for project {project_id} during {step}: {source}")]
    PersistenceFailed {
        project_id: String,
        step: PersistStep,
        context_id: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage} timed out after {}s for project {project_id}", .after.as_secs())]
    Timeout {
        project_id: String,
        stage: Stage,
        after: Duration,
    },
}

impl AnalysisError {
    pub fn project_id(&self) -> &str {
        match self {
            AnalysisError::ProjectNotFound { project_id }
            | AnalysisError::ProjectLookupFailed { project_id, .. }
            | AnalysisError::ContextRetrievalFailed { project_id, .. }
            | AnalysisError::GenerationUnavailable { project_id, .. }
            | AnalysisError::GenerationRefused { project_id, .. }
            | AnalysisError::SchemaViolation { project_id, .. }
            | AnalysisError::PersistenceFailed { project_id, .. }
            | AnalysisError::Timeout { project_id, .. } => project_id,
        }
    }

    /// The stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            AnalysisError::ProjectNotFound { .. } | AnalysisError::ProjectLookupFailed { .. } => {
                Stage::LoadProject
            }
            AnalysisError::ContextRetrievalFailed { .. } => Stage::RetrieveContext,
            AnalysisError::GenerationUnavailable { .. }
            | AnalysisError::GenerationRefused { .. } => Stage::Generate,
            AnalysisError::SchemaViolation { .. } => Stage::Validate,
            AnalysisError::PersistenceFailed { .. } => Stage::Persist,
            AnalysisError::Timeout { stage, .. } => *stage,
        }
    }

    /// Classify a generation failure for `project_id`.
    pub fn from_generation(project_id: &str, err: GenerationError) -> Self {
        match err {
            GenerationError::Unavailable(message) => AnalysisError::GenerationUnavailable {
                project_id: project_id.to_string(),
                message,
            },
            GenerationError::Refused(reason) => AnalysisError::GenerationRefused {
                project_id: project_id.to_string(),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_errors_map_to_generate_stage() {
        let unavailable =
            AnalysisError::from_generation("p1", GenerationError::Unavailable("503".to_string()));
        assert!(matches!(
            unavailable,
            AnalysisError::GenerationUnavailable { .. }
        ));
        assert_eq!(unavailable.stage(), Stage::Generate);

        let refused =
            AnalysisError::from_generation("p1", GenerationError::Refused("SAFETY".to_string()));
        assert!(matches!(refused, AnalysisError::GenerationRefused { .. }));
        assert_eq!(refused.project_id(), "p1");
    }

    #[test]
    fn test_timeout_message() {
        let err = AnalysisError::Timeout {
            project_id: "p1".to_string(),
            stage: Stage::Generate,
            after: Duration::from_secs(120),
        };
        assert_eq!(err.to_string(), "generate timed out after 120s for project p1");
    }

    #[test]
    fn test_schema_violation_keeps_raw_text() {
        let violation = SchemaViolation {
            path: "/screenOverview".to_string(),
            reason: "missing required field".to_string(),
            raw: "{}".to_string(),
        };
        let err = AnalysisError::SchemaViolation {
            project_id: "p1".to_string(),
            violation: violation.clone(),
        };
        assert_eq!(err.stage(), Stage::Validate);
        match err {
            AnalysisError::SchemaViolation { violation: v, .. } => assert_eq!(v.raw, "{}"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
