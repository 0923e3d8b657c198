//! Compact textual summary of an analysis, the unit stored in the vector
//! index for later retrieval.
//!
//! Only the fields that matter for screen-to-screen similarity are kept:
//! name, type, purpose and functional requirements. The requirements matrix
//! is deliberately left out.

use crate::models::AnalysisResult;

/// Project an analysis onto its retrieval summary.
///
/// ```rust
/// # use reqforge_core::models::*;
/// # let analysis = AnalysisResult {
/// #     screen_overview: ScreenOverview {
/// #         screen_name: "Login".into(),
/// #         screen_type: "Form".into(),
/// #         primary_purpose: "Sign in".into(),
/// #         user_role: "User".into(),
/// #         relationship_to_previous_screens: None,
/// #     },
/// #     requirements_matrix: vec![],
/// #     functional_requirements: vec!["Enter email".into(), "Enter password".into()],
/// #     non_functional_requirements: vec![],
/// #     business_rules: vec![],
/// #     assumptions_made: vec![],
/// # };
/// let text = reqforge_core::summary::project(&analysis);
/// assert_eq!(
///     text,
///     "Screen: Login (Form)\nPurpose: Sign in\n\nFunctional Requirements:\nEnter email\nEnter password\n"
/// );
/// ```
pub fn project(analysis: &AnalysisResult) -> String {
    let overview = &analysis.screen_overview;
    format!(
        "Screen: {} ({})\nPurpose: {}\n\nFunctional Requirements:\n{}\n",
        overview.screen_name,
        overview.screen_type,
        overview.primary_purpose,
        analysis.functional_requirements.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::login_analysis;

    #[test]
    fn test_summary_format() {
        let text = project(&login_analysis());
        assert_eq!(
            text,
            "Screen: Login (Authentication form)\n\
             Purpose: Let a registered user sign in\n\
             \n\
             Functional Requirements:\n\
             User can sign in with email and password\n\
             User can request a password reset\n"
        );
    }

    #[test]
    fn test_summary_deterministic() {
        let analysis = login_analysis();
        let first = project(&analysis);
        for _ in 0..5 {
            assert_eq!(project(&analysis).as_bytes(), first.as_bytes());
        }
        assert_eq!(project(&analysis.clone()), first);
    }

    #[test]
    fn test_summary_ignores_matrix() {
        let mut analysis = login_analysis();
        let before = project(&analysis);
        analysis.requirements_matrix.clear();
        analysis.business_rules.push("Another rule".to_string());
        assert_eq!(project(&analysis), before);
    }

    #[test]
    fn test_summary_no_functional_requirements() {
        let mut analysis = login_analysis();
        analysis.functional_requirements.clear();
        assert!(project(&analysis).ends_with("Functional Requirements:\n\n"));
    }
}
