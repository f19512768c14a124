//! Outcome of a summarisation attempt.

use serde::Serialize;

/// Shown instead of a summary when the text is below the minimum length
pub const TOO_SHORT_MESSAGE: &str = "Email is too short to summarize.";

/// Tagged result of [`crate::agent::summarize`].
///
/// Every variant renders to user-facing text; failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Outcome {
    /// Generated summary
    Summary(String),
    /// Input was too short to be worth summarising
    TooShort,
    /// Loading or generation failed; carries a readable reason
    Failure(String),
}

impl Outcome {
    /// Text to show in place of the summary
    pub fn message(&self) -> &str {
        match self {
            Outcome::Summary(text) | Outcome::Failure(text) => text,
            Outcome::TooShort => TOO_SHORT_MESSAGE,
        }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, Outcome::Summary(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
