//! Error taxonomy for analysis generation.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while building, generating, or persisting an analysis.
#[derive(Debug, Error)]
pub enum InsightError {
    /// No evaluations fall inside the requested class and period.
    #[error("no evaluations found for class '{class}' in period '{period}'")]
    EmptyDataset { class: String, period: String },

    /// The student has no grade records at all.
    #[error("no evaluations found for student '{student}'")]
    NoGrades { student: String },

    /// There are no classes to summarize.
    #[error("no classes to summarize")]
    NoClasses,

    /// No configured period contains the given date.
    #[error("no period configured for date {date}")]
    MissingPeriod { date: NaiveDate },

    /// A period is required but none are configured.
    #[error("no grading period is configured")]
    NoPeriodsConfigured,

    /// The text-generation service could not be reached or failed to answer.
    #[error("text-generation service unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// The service answered, but not with the expected JSON shape.
    #[error("invalid insight response: {reason}")]
    InvalidInsightResponse { reason: String, raw: String },

    #[error("prompt has {len} characters, limit is {max}")]
    PromptTooLarge { len: usize, max: usize },

    #[error("failed to encode analysis context: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InsightError {
    /// Only connectivity failures are worth retrying by hand.
    pub fn is_transient(&self) -> bool {
        matches!(self, InsightError::CollaboratorUnavailable(_))
    }

    /// Message shown to the person who requested the analysis.
    pub fn user_message(&self) -> String {
        match self {
            InsightError::EmptyDataset { .. }
            | InsightError::NoGrades { .. }
            | InsightError::NoClasses => {
                format!("Nothing to analyze yet: {}.", self)
            }
            InsightError::MissingPeriod { .. } | InsightError::NoPeriodsConfigured => {
                format!("Set up grading periods first: {}.", self)
            }
            InsightError::CollaboratorUnavailable(_) => {
                "Analysis service unavailable right now. Try again later.".to_string()
            }
            _ => format!("Could not generate a new analysis: {}", self),
        }
    }
}
