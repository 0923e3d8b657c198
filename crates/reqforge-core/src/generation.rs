//! Generation backend abstraction.
//!
//! A [`GenerationClient`] turns a [`GenerationRequest`] into the raw text of
//! the first candidate. Implementations enforce the response schema on the
//! provider side where supported; the returned text is still untrusted and
//! goes through [`crate::validate::validate`].

use async_trait::async_trait;

pub use crate::error::GenerationError;
pub use crate::prompt::GenerationRequest;

/// A vision-capable model invoked with a strict output schema.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Model identifier, used in log fields.
    fn model_name(&self) -> &str;

    /// Generate a response and return the first candidate's text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
