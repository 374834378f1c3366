//! The decision pipeline: a linear chain of policy gates.
//!
//! ```text
//! Start → ContextIdentified → ActionDecided → Retrieved → CostChecked
//!       → BudgetAdmitted → Completed → Answered
//! ```
//!
//! Every non-terminal stage transitions forward on success or to `Escalated`
//! on any gate failure; there are no loops and no backward transitions. Any
//! fault inside a stage is caught at the stage boundary and converted into a
//! stage-specific escalation reason, so every invocation terminates in a
//! well-formed [`PipelineOutcome`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::budget::BudgetLedger;
use crate::completion::CompletionProvider;
use crate::config::TriageConfig;
use crate::context::IdentifiedContext;
use crate::cost;
use crate::outcome::{reasons, PipelineOutcome};
use crate::retrieval::RetrievalGateway;

/// System instruction pinning the model to the retrieved content.
const SYSTEM_INSTRUCTION: &str = "Answer ONLY from provided content.";

/// Confidence floor: fewer than this many passages is too weak a signal to
/// trust an unsupervised generative answer.
const MIN_PASSAGES: usize = 2;

/// Stages of the gate chain, in order.
///
/// `Escalated` and `Answered` are the only terminal stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    ContextIdentified,
    ActionDecided,
    Retrieved,
    CostChecked,
    BudgetAdmitted,
    Completed,
    Escalated,
    Answered,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Escalated | Self::Answered)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::ContextIdentified => write!(f, "context_identified"),
            Self::ActionDecided => write!(f, "action_decided"),
            Self::Retrieved => write!(f, "retrieved"),
            Self::CostChecked => write!(f, "cost_checked"),
            Self::BudgetAdmitted => write!(f, "budget_admitted"),
            Self::Completed => write!(f, "completed"),
            Self::Escalated => write!(f, "escalated"),
            Self::Answered => write!(f, "answered"),
        }
    }
}

/// Outcome of the action decision gate.
enum Action {
    Respond,
    Escalate,
}

/// Pure decision over an identified context. Attaches the escalation reason
/// when routing away from the AI path.
fn decide_action(ctx: &mut IdentifiedContext) -> Action {
    if ctx.is_advanced() {
        ctx.escalation_reason = Some(reasons::ADVANCED_QUESTION.to_string());
        return Action::Escalate;
    }
    Action::Respond
}

/// Orchestrates the gate chain over the retrieval gateway, budget ledger,
/// and completion provider. One instance serves concurrent requests; all
/// per-request state is owned by the invocation.
pub struct DecisionPipeline {
    retrieval: Arc<dyn RetrievalGateway>,
    provider: Arc<dyn CompletionProvider>,
    ledger: Arc<BudgetLedger>,
    cost_ceiling_tokens: u64,
    retrieval_limit: usize,
    max_output_tokens: u32,
}

impl DecisionPipeline {
    pub fn new(
        retrieval: Arc<dyn RetrievalGateway>,
        provider: Arc<dyn CompletionProvider>,
        ledger: Arc<BudgetLedger>,
        config: &TriageConfig,
    ) -> Self {
        Self {
            retrieval,
            provider,
            ledger,
            cost_ceiling_tokens: config.cost_ceiling_tokens,
            retrieval_limit: config.retrieval_limit,
            max_output_tokens: config.max_output_tokens,
        }
    }

    /// Run one question through the gate chain.
    ///
    /// Infallible by contract: every path, including internal faults,
    /// terminates in an `Answer` or an `Escalate`.
    pub async fn handle(&self, question: &str, subject: &str, chapter: &str) -> PipelineOutcome {
        let request_id = Uuid::new_v4();
        let outcome = self.run(request_id, question, subject, chapter).await;

        match &outcome {
            PipelineOutcome::Answer { .. } => {
                info!(%request_id, stage = %PipelineStage::Answered, "question answered");
            }
            PipelineOutcome::Escalate { reason } => {
                info!(%request_id, stage = %PipelineStage::Escalated, reason, "question escalated");
            }
        }
        outcome
    }

    async fn run(
        &self,
        request_id: Uuid,
        question: &str,
        subject: &str,
        chapter: &str,
    ) -> PipelineOutcome {
        // Gate 1: context identification.
        let mut ctx = match IdentifiedContext::identify(question, subject, chapter) {
            Ok(ctx) => ctx,
            Err(err) => {
                warn!(%request_id, %err, "context identification failed");
                return PipelineOutcome::escalate(reasons::CONTEXT_FAILURE);
            }
        };
        advance(request_id, PipelineStage::ContextIdentified);

        // Gate 2: action decision. Pure function of the context.
        if let Action::Escalate = decide_action(&mut ctx) {
            let reason = ctx
                .escalation_reason
                .clone()
                .unwrap_or_else(|| reasons::ADVANCED_QUESTION.to_string());
            return PipelineOutcome::escalate(reason);
        }
        advance(request_id, PipelineStage::ActionDecided);

        // Gate 3: retrieval plus the confidence floor.
        let passages = self
            .retrieval
            .search(&ctx.question, &ctx.subject, &ctx.chapter, self.retrieval_limit)
            .await;
        if passages.is_empty() {
            return PipelineOutcome::escalate(reasons::NO_CONTENT);
        }
        if passages.len() < MIN_PASSAGES {
            return PipelineOutcome::escalate(reasons::LOW_CONFIDENCE);
        }
        advance(request_id, PipelineStage::Retrieved);

        // Gate 4: cost kill-switch. Pre-admission: runs before the ledger or
        // the provider are ever contacted.
        let content = passages.join("\n");
        let estimated = cost::estimate_tokens(&content);
        if estimated > self.cost_ceiling_tokens {
            warn!(
                %request_id,
                estimated,
                ceiling = self.cost_ceiling_tokens,
                "retrieved content over cost ceiling"
            );
            return PipelineOutcome::escalate(reasons::CONTEXT_TOO_LARGE);
        }
        advance(request_id, PipelineStage::CostChecked);

        // Gate 5: budget admission. Zero-token check: tests the caps without
        // consuming anything.
        match self.ledger.check_and_update(0).await {
            Ok(admission) if admission.exceeded => {
                let reason = admission.reason.unwrap_or(reasons::BUDGET_CHECK_FAILURE);
                return PipelineOutcome::escalate(reason);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%request_id, %err, "budget admission check failed");
                return PipelineOutcome::escalate(reasons::BUDGET_CHECK_FAILURE);
            }
        }
        advance(request_id, PipelineStage::BudgetAdmitted);

        // Gate 6: completion. One call, hard timeout, no retry.
        let user_content = format!("Content:\n{content}\n\nQuestion:\n{}", ctx.question);
        let completion = match self
            .provider
            .complete(SYSTEM_INSTRUCTION, &user_content, self.max_output_tokens)
            .await
        {
            Ok(completion) => completion,
            Err(err) => {
                warn!(%request_id, %err, "provider call failed");
                return PipelineOutcome::escalate(reasons::PROVIDER_FAILURE);
            }
        };
        if completion.text.trim().is_empty() {
            return PipelineOutcome::escalate(reasons::EMPTY_RESPONSE);
        }
        advance(request_id, PipelineStage::Completed);

        // Stage 7: settlement with the provider-reported usage. Best-effort:
        // losing a token count is preferable to discarding a correct answer.
        if let Err(err) = self
            .ledger
            .check_and_update(completion.usage.total_tokens)
            .await
        {
            warn!(%request_id, %err, "budget settlement failed");
        }

        PipelineOutcome::answer(completion.text)
    }
}

fn advance(request_id: Uuid, stage: PipelineStage) {
    debug!(%request_id, stage = %stage, "pipeline stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Difficulty;

    #[test]
    fn decide_action_escalates_advanced_with_reason() {
        let mut ctx = IdentifiedContext::identify("Prove it", "Math", "Proofs").unwrap();
        assert_eq!(ctx.difficulty, Difficulty::Advanced);

        assert!(matches!(decide_action(&mut ctx), Action::Escalate));
        assert_eq!(
            ctx.escalation_reason.as_deref(),
            Some(reasons::ADVANCED_QUESTION)
        );
    }

    #[test]
    fn decide_action_responds_to_basic() {
        let mut ctx = IdentifiedContext::identify("What is 2+2?", "Math", "Addition").unwrap();
        assert!(matches!(decide_action(&mut ctx), Action::Respond));
        assert!(ctx.escalation_reason.is_none());
    }

    #[test]
    fn terminal_stages() {
        assert!(PipelineStage::Escalated.is_terminal());
        assert!(PipelineStage::Answered.is_terminal());
        assert!(!PipelineStage::BudgetAdmitted.is_terminal());
    }
}
