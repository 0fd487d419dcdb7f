//! Error types for the quiz engine.
//!
//! `QuizError` is what every fallible session and bank operation returns.
//! `GatewayError` is defined here as well so the session can classify a
//! failed recommendation call without depending on any gateway crate.

use thiserror::Error;

use crate::parser::ContentIssue;

/// Errors returned by question bank construction and session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// The requested transition is not valid in the current state.
    #[error(transparent)]
    State(#[from] StateError),

    /// The selected answer does not fit the current question.
    #[error(transparent)]
    InvalidAnswerValue(#[from] ValidationError),

    /// The bank holds no gradable questions.
    #[error("question set is empty: nothing to quiz on")]
    EmptyQuestionSet,

    /// The generator bundle is structurally invalid.
    #[error("content bundle rejected: {}", format_issues(.issues))]
    ContentValidation { issues: Vec<ContentIssue> },

    /// The session already completed; it accepts no further mutations.
    #[error("session is closed")]
    SessionClosed,

    /// A question index outside `[0, count)`.
    #[error("question index {index} out of range (bank has {count} questions)")]
    IndexOutOfRange { index: usize, count: usize },
}

fn format_issues(issues: &[ContentIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Invalid state machine transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("session has not been started")]
    NotStarted,

    #[error("session was already started")]
    AlreadyStarted,

    #[error("no answer selected for the current question")]
    NoSelection,

    #[error("current question was already submitted")]
    AlreadySubmitted,

    #[error("current question has not been submitted yet")]
    NotSubmitted,

    #[error("session has not completed yet")]
    NotCompleted,
}

/// An answer value that cannot be committed against a question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The answer's shape does not match the question type.
    #[error("expected {expected} answer, got {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An option index past the end of the option list.
    #[error("option {index} out of range ({option_count} options)")]
    OptionOutOfRange { index: usize, option_count: usize },

    /// The same option selected more than once.
    #[error("option {0} selected more than once")]
    DuplicateSelection(usize),

    /// Free-text questions are graded outside this engine.
    #[error("short-answer questions are not graded automatically")]
    NotAutoGraded,
}

/// Errors that can occur when calling the recommendation service.
///
/// Always non-fatal for a session: the completion summary carries the message
/// as a warning and keeps its own score and statistics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The service rejected our credentials.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The service returned 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The call did not finish in time.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The service could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call was cancelled before it produced a result.
    #[error("recommendation request abandoned")]
    Abandoned,
}

impl GatewayError {
    /// Returns `true` if retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GatewayError::Unauthorized(_) | GatewayError::InvalidResponse(_)
        )
    }
}
