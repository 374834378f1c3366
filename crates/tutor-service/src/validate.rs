//! Caller-side input validation.
//!
//! Violations are rejected before the pipeline is ever invoked, and surface
//! as a validation error distinct from an escalation outcome. The pipeline
//! never sees an invalid request.

use thiserror::Error;

/// Maximum question length in characters.
pub const MAX_QUESTION_CHARS: usize = 500;
/// Maximum question length in words.
pub const MAX_QUESTION_WORDS: usize = 80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("question, subject, and chapter are required")]
    MissingField,

    #[error("question exceeds {} characters", MAX_QUESTION_CHARS)]
    QuestionTooLong,

    #[error("question exceeds {} words", MAX_QUESTION_WORDS)]
    QuestionTooManyWords,
}

/// Validate an inbound ask-question request.
pub fn validate_question(
    question: &str,
    subject: &str,
    chapter: &str,
) -> Result<(), ValidationError> {
    if question.trim().is_empty() || subject.trim().is_empty() || chapter.trim().is_empty() {
        return Err(ValidationError::MissingField);
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ValidationError::QuestionTooLong);
    }
    if question.split_whitespace().count() > MAX_QUESTION_WORDS {
        return Err(ValidationError::QuestionTooManyWords);
    }
    Ok(())
}
