//! Validator behavior against hand-written model responses.
//!
//! Each fixture under `tests/fixtures/` is a payload a model could plausibly
//! return; the tests pin down which ones are accepted and where the rest
//! fail.

use reqforge_core::summary;
use reqforge_core::validate::validate;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {}", path, e))
}

#[test]
fn valid_login_accepted() {
    let analysis = validate(&fixture("valid_login.json")).unwrap();
    assert_eq!(analysis.screen_overview.screen_name, "Login");
    assert_eq!(analysis.requirements_matrix.len(), 3);
    assert_eq!(analysis.requirements_matrix[2].notes, "");
    assert!(analysis
        .screen_overview
        .relationship_to_previous_screens
        .is_none());
}

#[test]
fn valid_login_reserializes_to_same_analysis() {
    let analysis = validate(&fixture("valid_login.json")).unwrap();
    let again = validate(&serde_json::to_string(&analysis).unwrap()).unwrap();
    assert_eq!(again, analysis);
}

#[test]
fn dashboard_with_relationship_and_extra_key_accepted() {
    let analysis = validate(&fixture("valid_dashboard_with_relationship.json")).unwrap();
    assert_eq!(
        analysis
            .screen_overview
            .relationship_to_previous_screens
            .as_deref(),
        Some("Reached after a successful sign-in on the Login screen")
    );
    assert!(analysis.requirements_matrix.is_empty());
}

#[test]
fn missing_top_level_key_rejected() {
    let raw = fixture("missing_assumptions.json");
    let err = validate(&raw).unwrap_err();
    assert_eq!(err.path, "/assumptionsMade");
    assert_eq!(err.reason, "missing required field");
    assert_eq!(err.raw, raw);
}

#[test]
fn matrix_row_missing_field_rejects_whole_response() {
    let err = validate(&fixture("matrix_row_missing_error_handling.json")).unwrap_err();
    assert_eq!(err.path, "/requirementsMatrix/1/errorHandling");
}

#[test]
fn string_where_list_expected_rejected() {
    let err = validate(&fixture("requirements_as_string.json")).unwrap_err();
    assert_eq!(err.path, "/functionalRequirements");
    assert_eq!(err.reason, "expected array, found string");
}

#[test]
fn truncated_output_rejected() {
    let err = validate(&fixture("truncated.json")).unwrap_err();
    assert!(err.reason.starts_with("response is not valid JSON"));
}

#[test]
fn markdown_fenced_output_rejected_not_patched() {
    let err = validate(&fixture("fenced_markdown.txt")).unwrap_err();
    assert_eq!(err.path, "");
    assert!(err.raw.starts_with("```json"));
}

#[test]
fn summary_of_fixture() {
    let analysis = validate(&fixture("valid_dashboard_with_relationship.json")).unwrap();
    assert_eq!(
        summary::project(&analysis),
        "Screen: Account dashboard (Dashboard)\n\
         Purpose: Summarize balances and recent activity\n\
         \n\
         Functional Requirements:\n\
         The system shall list the five most recent transactions\n"
    );
}
