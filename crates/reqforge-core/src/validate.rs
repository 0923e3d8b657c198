//! Structural validation of raw model output.
//!
//! [`validate`] is the single gate deciding whether a generated analysis is
//! usable. The text must parse as JSON and match [`ANALYSIS`] exactly as
//! declared: every required key present, every value of the declared shape.
//! A single missing or mistyped field rejects the whole response; nothing is
//! patched, defaulted or coerced.

use crate::error::SchemaViolation;
use crate::models::AnalysisResult;
use crate::schema::ANALYSIS;

/// Parse and validate `raw` into an [`AnalysisResult`].
///
/// # Errors
///
/// Returns a [`SchemaViolation`] carrying the offending location, a reason
/// and the raw text when `raw` is not JSON or does not match the schema.
///
/// # Example
///
/// ```rust
/// use reqforge_core::validate::validate;
///
/// let err = validate(r#"{"screenOverview": {}}"#).unwrap_err();
/// assert_eq!(err.path, "/screenOverview/screenName");
/// ```
pub fn validate(raw: &str) -> Result<AnalysisResult, SchemaViolation> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| SchemaViolation {
        path: String::new(),
        reason: format!("response is not valid JSON: {}", e),
        raw: raw.to_string(),
    })?;

    ANALYSIS.check(&value).map_err(|m| SchemaViolation {
        path: m.path,
        reason: m.reason,
        raw: raw.to_string(),
    })?;

    // The schema walk above guarantees the typed decode succeeds; a failure
    // here means the schema and the model type have drifted apart.
    serde_json::from_value(value).map_err(|e| SchemaViolation {
        path: String::new(),
        reason: format!("response does not decode into an analysis: {}", e),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::login_analysis;
    use serde_json::{json, Value};

    fn login_value() -> Value {
        serde_json::to_value(login_analysis()).unwrap()
    }

    #[test]
    fn test_roundtrip_valid_analysis() {
        let analysis = login_analysis();
        let raw = serde_json::to_string(&analysis).unwrap();
        assert_eq!(validate(&raw).unwrap(), analysis);
    }

    #[test]
    fn test_roundtrip_with_relationship() {
        let mut analysis = login_analysis();
        analysis.screen_overview.relationship_to_previous_screens =
            Some("Reached after the landing page".to_string());
        let raw = serde_json::to_string_pretty(&analysis).unwrap();
        assert_eq!(validate(&raw).unwrap(), analysis);
    }

    #[test]
    fn test_not_json_rejected() {
        let err = validate("Sure! Here is the analysis: {").unwrap_err();
        assert_eq!(err.path, "");
        assert!(err.reason.starts_with("response is not valid JSON"));
        assert_eq!(err.raw, "Sure! Here is the analysis: {");
    }

    #[test]
    fn test_each_missing_top_level_key_rejected() {
        for key in [
            "screenOverview",
            "requirementsMatrix",
            "functionalRequirements",
            "nonFunctionalRequirements",
            "businessRules",
            "assumptionsMade",
        ] {
            let mut value = login_value();
            value.as_object_mut().unwrap().remove(key);
            let err = validate(&value.to_string()).unwrap_err();
            assert_eq!(err.path, format!("/{}", key));
            assert_eq!(err.reason, "missing required field");
        }
    }

    #[test]
    fn test_each_missing_matrix_field_rejected() {
        for key in [
            "uiElement",
            "elementType",
            "behavior",
            "dataSource",
            "validationRules",
            "errorHandling",
            "businessRules",
            "notes",
        ] {
            let mut value = login_value();
            value["requirementsMatrix"][0]
                .as_object_mut()
                .unwrap()
                .remove(key);
            let err = validate(&value.to_string()).unwrap_err();
            assert_eq!(err.path, format!("/requirementsMatrix/0/{}", key));
        }
    }

    #[test]
    fn test_one_bad_row_rejects_whole_matrix() {
        let mut value = login_value();
        let good_row = value["requirementsMatrix"][0].clone();
        let mut bad_row = good_row.clone();
        bad_row.as_object_mut().unwrap().remove("notes");
        value["requirementsMatrix"] = json!([good_row, bad_row]);
        let err = validate(&value.to_string()).unwrap_err();
        assert_eq!(err.path, "/requirementsMatrix/1/notes");
    }

    #[test]
    fn test_string_instead_of_list_rejected() {
        let mut value = login_value();
        value["functionalRequirements"] = json!("User can sign in");
        let err = validate(&value.to_string()).unwrap_err();
        assert_eq!(err.path, "/functionalRequirements");
        assert_eq!(err.reason, "expected array, found string");
    }

    #[test]
    fn test_number_in_matrix_rejected() {
        let mut value = login_value();
        value["requirementsMatrix"][0]["notes"] = json!(3);
        let err = validate(&value.to_string()).unwrap_err();
        assert_eq!(err.reason, "expected string, found number");
    }

    #[test]
    fn test_top_level_array_rejected() {
        let err = validate("[]").unwrap_err();
        assert_eq!(err.reason, "expected object, found array");
    }

    #[test]
    fn test_extra_keys_ignored() {
        let mut value = login_value();
        value["confidence"] = json!(0.9);
        assert_eq!(validate(&value.to_string()).unwrap(), login_analysis());
    }

    #[test]
    fn test_empty_lists_accepted() {
        let mut value = login_value();
        value["requirementsMatrix"] = json!([]);
        value["assumptionsMade"] = json!([]);
        let analysis = validate(&value.to_string()).unwrap();
        assert!(analysis.requirements_matrix.is_empty());
        assert!(analysis.assumptions_made.is_empty());
    }
}
