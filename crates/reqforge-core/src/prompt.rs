//! Generation request assembly.
//!
//! [`build`] combines the project, the retrieved context documents and the
//! screenshot into a [`GenerationRequest`]: an instruction block naming the
//! analyst role, the prompt text (previous-screens context, project details
//! and analysis instructions), the output schema rendered from
//! [`ANALYSIS`], and the image as a base64 payload.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::models::Project;
use crate::schema::ANALYSIS;

/// Separator placed between retrieved context documents.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Everything the generation backend needs for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Role and project framing, sent as the system instruction.
    pub system_instruction: String,
    /// The user prompt sent alongside the image.
    pub prompt_text: String,
    /// JSON Schema the response must conform to.
    pub response_schema: serde_json::Value,
    pub image: ImagePayload,
}

/// A typed inline binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Standard base64 encoding of the image bytes.
    pub data: String,
}

/// Join context documents into the previous-screens block (empty when none).
pub fn context_block(context_documents: &[String]) -> String {
    context_documents.join(CONTEXT_SEPARATOR)
}

/// Assemble the generation request for one screenshot.
pub fn build(
    project: &Project,
    context_documents: &[String],
    image_bytes: &[u8],
    image_mime_type: &str,
) -> GenerationRequest {
    let system_instruction = format!(
        "You are an expert Business Analyst and UI/UX specialist documenting the \
         requirements of the project \"{}\".\nProject description: {}",
        project.name, project.description
    );

    let prompt_text = format!(
        "Analyze the provided UI screenshot and produce comprehensive requirements documentation.\n\
         \n\
         Previous Screens Context:\n\
         {context}\n\
         \n\
         Project: {name}\n\
         Description: {description}\n\
         \n\
         {instructions}",
        context = context_block(context_documents),
        name = project.name,
        description = project.description,
        instructions = ANALYSIS_INSTRUCTIONS,
    );

    GenerationRequest {
        system_instruction,
        prompt_text,
        response_schema: ANALYSIS.to_json_schema(),
        image: ImagePayload {
            mime_type: image_mime_type.to_string(),
            data: BASE64_STANDARD.encode(image_bytes),
        },
    }
}

const ANALYSIS_INSTRUCTIONS: &str = "\
Work systematically, use professional business analysis terminology and base \
assumptions on common UI patterns.

1. Screen identification: name the screen, classify its type (login, dashboard, \
form, list view, ...), state its primary purpose and the user role that uses it. \
When previous screens are given above, describe how this screen relates to them \
and reuse their terminology for shared elements.
2. UI elements: for every visible element give its type, expected behavior, data \
source, validation rules, error handling, business rules and any notes.
3. Interaction patterns: primary workflows, navigation, form submission and data \
manipulation become functional requirements.
4. Technical qualities: responsiveness, accessibility, performance and integration \
points become non-functional requirements.

Respond with a single JSON object matching the supplied response schema: \
screenOverview, requirementsMatrix (one row per UI element), functionalRequirements, \
nonFunctionalRequirements, businessRules and assumptionsMade. Be specific. When \
unsure about functionality, record the assumption in assumptionsMade for review.";
