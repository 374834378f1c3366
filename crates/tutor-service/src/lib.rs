//! Caller-side shell around the triage pipeline.
//!
//! Hosts everything the decision core deliberately does not own: the HTTP
//! front door, caller-side input validation, and the escalation notifier
//! side effect. The pipeline computes an outcome; this crate decides how it
//! reaches the student and the teacher.

pub mod notifier;
pub mod server;
pub mod validate;
