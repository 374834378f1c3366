//! Escalation notification via a Mailgun-style messages API.
//!
//! The notifier is a side effect of the caller, not the pipeline: it fires
//! after the outcome is already computed, and its delivery failures are
//! logged and swallowed so they can never alter the response.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

/// Timeout for the outbound mail API call.
const MAIL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail request failed: {0}")]
    Request(String),

    #[error("mail API returned status {0}")]
    BadStatus(u16),
}

/// Seam for delivering escalations to the teacher.
#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    async fn notify(&self, subject_line: &str, body: &str) -> Result<(), NotifyError>;
}

/// Deterministic escalation message: subject line and body embedding the
/// original question, its scope, and the gate's reason.
pub fn escalation_message(
    question: &str,
    subject: &str,
    chapter: &str,
    reason: &str,
) -> (String, String) {
    let subject_line = format!("Tutor Triage Escalation | {subject} - {chapter}");
    let body = format!(
        "Student Question:\n{question}\n\n\
         Context:\nSubject: {subject}\nChapter: {chapter}\n\n\
         Engine Decision:\n{reason}\n"
    );
    (subject_line, body)
}

/// Mailgun configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub from: String,
    pub teacher_email: String,
}

impl MailConfig {
    /// Read from the environment; `None` when any required variable is
    /// absent, in which case the service falls back to [`LogNotifier`].
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("MAILGUN_API_KEY").ok()?;
        let domain = std::env::var("MAILGUN_DOMAIN").ok()?;
        let teacher_email = std::env::var("TEACHER_EMAIL").ok()?;
        let from = std::env::var("MAILGUN_FROM")
            .unwrap_or_else(|_| format!("Tutor Triage <postmaster@{domain}>"));
        Some(Self {
            api_key,
            domain,
            from,
            teacher_email,
        })
    }
}

/// Notifier posting to the Mailgun messages endpoint.
pub struct MailgunNotifier {
    config: MailConfig,
    client: reqwest::Client,
}

impl MailgunNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(MAIL_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl EscalationNotifier for MailgunNotifier {
    async fn notify(&self, subject_line: &str, body: &str) -> Result<(), NotifyError> {
        let url = format!(
            "https://api.mailgun.net/v3/{}/messages",
            self.config.domain
        );

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .form(&[
                ("from", self.config.from.as_str()),
                ("to", self.config.teacher_email.as_str()),
                ("subject", subject_line),
                ("text", body),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::BadStatus(response.status().as_u16()));
        }

        info!(to = %self.config.teacher_email, "escalation mail sent");
        Ok(())
    }
}

/// Fallback notifier recording the escalation in the log stream only.
pub struct LogNotifier;

#[async_trait]
impl EscalationNotifier for LogNotifier {
    async fn notify(&self, subject_line: &str, _body: &str) -> Result<(), NotifyError> {
        warn!(subject_line, "escalation (mail not configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_embeds_question_scope_and_reason() {
        let (subject_line, body) = escalation_message(
            "What is 2+2?",
            "Math",
            "Addition",
            "No syllabus content found",
        );

        assert_eq!(subject_line, "Tutor Triage Escalation | Math - Addition");
        assert!(body.contains("What is 2+2?"));
        assert!(body.contains("Subject: Math"));
        assert!(body.contains("Chapter: Addition"));
        assert!(body.contains("No syllabus content found"));
    }

    #[test]
    fn message_is_deterministic() {
        let a = escalation_message("q", "s", "c", "r");
        let b = escalation_message("q", "s", "c", "r");
        assert_eq!(a, b);
    }
}
