//! Terminal pipeline outcome and the stable escalation reason strings.

use serde::{Deserialize, Serialize};

/// Escalation reasons produced by the pipeline gates.
///
/// Downstream consumers (the notifier, analytics) match on these exactly,
/// so they are constants rather than ad hoc format strings. The budget cap
/// reasons live with the ledger in [`crate::budget`].
pub mod reasons {
    /// Malformed input prevented building an identified context.
    pub const CONTEXT_FAILURE: &str = "Context identification failure";
    /// The difficulty classifier routed the question to a human.
    pub const ADVANCED_QUESTION: &str = "Advanced question requires teacher";
    /// Retrieval returned nothing for the (subject, chapter) scope.
    pub const NO_CONTENT: &str = "No syllabus content found";
    /// Fewer passages than the confidence floor requires.
    pub const LOW_CONFIDENCE: &str = "Insufficient retrieval confidence";
    /// Estimated token cost of the retrieved content exceeded the ceiling.
    pub const CONTEXT_TOO_LARGE: &str = "Context too large for safe processing";
    /// The budget store faulted during the admission check.
    pub const BUDGET_CHECK_FAILURE: &str = "Budget check failure";
    /// The completion provider timed out, failed, or returned garbage.
    pub const PROVIDER_FAILURE: &str = "AI provider failure";
    /// The provider succeeded but produced no answer text.
    pub const EMPTY_RESPONSE: &str = "Empty AI response";
}

/// Terminal result of one pipeline invocation.
///
/// Either a safe AI-generated answer or an escalation to a human
/// subject-matter expert. The caller's only contract is
/// [`is_escalation`](Self::is_escalation); the reason string is for the
/// notifier and for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Answer generated from retrieved syllabus content only.
    Answer { text: String },
    /// Question routed to a human SME, with the gate's reason.
    Escalate { reason: String },
}

impl PipelineOutcome {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer { text: text.into() }
    }

    pub fn escalate(reason: impl Into<String>) -> Self {
        Self::Escalate {
            reason: reason.into(),
        }
    }

    /// Whether this outcome routes the question to a human.
    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Escalate { .. })
    }

    /// The escalation reason, if any.
    pub fn escalation_reason(&self) -> Option<&str> {
        match self {
            Self::Escalate { reason } => Some(reason),
            Self::Answer { .. } => None,
        }
    }
}
