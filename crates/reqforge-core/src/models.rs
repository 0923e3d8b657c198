//! Core data models used throughout reqforge.
//!
//! These types represent the projects, screens and structured analyses that
//! flow through the screen-analysis pipeline. [`AnalysisResult`] uses the
//! camelCase field names of the model's JSON output so that it serializes
//! to exactly the shape described by [`crate::schema::ANALYSIS`].

use serde::{Deserialize, Serialize};

/// A requirements documentation project: an ordered list of analyzed screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Screens in upload order.
    pub screens: Vec<Screen>,
}

/// One analyzed screenshot belonging to a [`Project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: String,
    /// The validated [`AnalysisResult`], serialized as JSON text.
    pub screen: String,
    pub image: ImageRef,
    /// Id of the context document written to the vector index for this screen.
    pub context_id: String,
}

impl Screen {
    /// Decode the stored analysis text.
    pub fn analysis(&self) -> serde_json::Result<AnalysisResult> {
        serde_json::from_str(&self.screen)
    }
}

/// Stable reference to a stored screenshot image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub identifier: String,
    pub url: String,
    /// RFC 3339 upload timestamp.
    pub created_at: String,
}

/// The validated structured output of one screen analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub screen_overview: ScreenOverview,
    pub requirements_matrix: Vec<RequirementRow>,
    pub functional_requirements: Vec<String>,
    pub non_functional_requirements: Vec<String>,
    pub business_rules: Vec<String>,
    pub assumptions_made: Vec<String>,
}

/// Identification of the analyzed screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenOverview {
    pub screen_name: String,
    pub screen_type: String,
    pub primary_purpose: String,
    pub user_role: String,
    /// How this screen relates to earlier screens of the project. Absent for
    /// the first screen, where there is nothing to relate to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_to_previous_screens: Option<String>,
}

/// One row of the requirements matrix: a single UI element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementRow {
    pub ui_element: String,
    pub element_type: String,
    pub behavior: String,
    pub data_source: String,
    pub validation_rules: String,
    pub error_handling: String,
    pub business_rules: String,
    pub notes: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_serializes_camel_case() {
        let value = serde_json::to_value(fixtures::login_analysis()).unwrap();
        assert!(value.get("screenOverview").is_some());
        assert!(value["screenOverview"].get("screenName").is_some());
        assert!(value["requirementsMatrix"][0].get("uiElement").is_some());
        assert!(value.get("assumptionsMade").is_some());
        assert!(value["screenOverview"]
            .get("relationshipToPreviousScreens")
            .is_none());
    }

    #[test]
    fn test_screen_analysis_decodes_stored_text() {
        let analysis = fixtures::login_analysis();
        let screen = Screen {
            id: "s1".to_string(),
            screen: serde_json::to_string(&analysis).unwrap(),
            image: ImageRef {
                identifier: "img".to_string(),
                url: "file:///tmp/img.png".to_string(),
                created_at: "2026-01-01T00:00:00Z".to_string(),
            },
            context_id: "analysis-p1-1".to_string(),
        };
        assert_eq!(screen.analysis().unwrap(), analysis);
    }
}
