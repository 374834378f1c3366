//! Tutor Triage Core
//!
//! Decision-and-guardrail pipeline for a student-support assistant. Given a
//! question plus subject/chapter scope, the pipeline retrieves matching
//! syllabus passages and runs a linear chain of policy gates:
//!
//! ```text
//! context identification → action decision → retrieval confidence
//!     → cost kill-switch → budget admission → completion → settlement
//! ```
//!
//! Every gate either passes the request forward or short-circuits to an
//! escalation with a stable, human-readable reason. Every invocation
//! terminates in a well-formed [`outcome::PipelineOutcome`]; no fault ever
//! escapes the pipeline boundary.
//!
//! The gates themselves are pure policy with no LLM involvement. The only
//! network calls are the completion request itself ([`completion`]) and,
//! when configured, the Postgres-backed budget store ([`budget`]).

pub mod budget;
pub mod completion;
pub mod config;
pub mod context;
pub mod cost;
pub mod outcome;
pub mod pipeline;
pub mod retrieval;
