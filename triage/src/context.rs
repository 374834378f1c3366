//! Context identification and difficulty classification.
//!
//! The identified context is a typed record with a fixed field set, built
//! and validated once per request. Validation happens at construction time;
//! there is no partially-built context in the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keywords that mark a question as advanced. Matched case-insensitively as
/// substrings of the question text.
const ADVANCED_KEYWORDS: [&str; 3] = ["prove", "derive", "theorem"];

/// Difficulty bucket assigned by the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Advanced,
}

impl Difficulty {
    /// Classify a question by scanning for advanced keywords.
    pub fn classify(question: &str) -> Self {
        let lower = question.to_lowercase();
        if ADVANCED_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Self::Advanced
        } else {
            Self::Basic
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Failure to build an [`IdentifiedContext`] from raw inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("subject is empty")]
    EmptySubject,
    #[error("chapter is empty")]
    EmptyChapter,
}

/// Per-request context derived once from the inbound question.
///
/// Owned exclusively by one pipeline invocation and discarded when it
/// completes. `escalation_reason` is attached by the action decision when
/// the context must route to a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifiedContext {
    pub question: String,
    pub subject: String,
    pub chapter: String,
    pub difficulty: Difficulty,
    pub escalation_reason: Option<String>,
}

impl IdentifiedContext {
    /// Build and validate the context for one request.
    pub fn identify(
        question: &str,
        subject: &str,
        chapter: &str,
    ) -> Result<Self, ContextError> {
        if question.trim().is_empty() {
            return Err(ContextError::EmptyQuestion);
        }
        if subject.trim().is_empty() {
            return Err(ContextError::EmptySubject);
        }
        if chapter.trim().is_empty() {
            return Err(ContextError::EmptyChapter);
        }

        Ok(Self {
            question: question.to_string(),
            subject: subject.to_string(),
            chapter: chapter.to_string(),
            difficulty: Difficulty::classify(question),
            escalation_reason: None,
        })
    }

    pub fn is_advanced(&self) -> bool {
        self.difficulty == Difficulty::Advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_basic_question() {
        assert_eq!(Difficulty::classify("What is 2+2?"), Difficulty::Basic);
    }

    #[test]
    fn classify_advanced_keywords_any_case() {
        assert_eq!(
            Difficulty::classify("Prove that the square root of 2 is irrational"),
            Difficulty::Advanced
        );
        assert_eq!(
            Difficulty::classify("DERIVE the quadratic formula"),
            Difficulty::Advanced
        );
        assert_eq!(
            Difficulty::classify("state the pythagorean THEOREM"),
            Difficulty::Advanced
        );
    }

    #[test]
    fn classify_matches_keyword_substrings() {
        // Substring matching is intentional: "improve" contains "prove".
        assert_eq!(
            Difficulty::classify("How can I improve my essay?"),
            Difficulty::Advanced
        );
    }

    #[test]
    fn identify_builds_context_with_difficulty() {
        let ctx = IdentifiedContext::identify("What is 2+2?", "Math", "Addition").unwrap();
        assert_eq!(ctx.difficulty, Difficulty::Basic);
        assert_eq!(ctx.subject, "Math");
        assert_eq!(ctx.chapter, "Addition");
        assert!(ctx.escalation_reason.is_none());
    }

    #[test]
    fn identify_rejects_blank_fields() {
        assert!(matches!(
            IdentifiedContext::identify("  ", "Math", "Addition"),
            Err(ContextError::EmptyQuestion)
        ));
        assert!(matches!(
            IdentifiedContext::identify("q", "", "Addition"),
            Err(ContextError::EmptySubject)
        ));
        assert!(matches!(
            IdentifiedContext::identify("q", "Math", " "),
            Err(ContextError::EmptyChapter)
        ));
    }
}
