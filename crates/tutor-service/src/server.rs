//! HTTP front door: routing, caller-side validation, escalation side effect.
//!
//! Deliberately thin: the decision core owns every policy; this layer only
//! validates input, runs the pipeline, and fires the notifier when the
//! outcome is an escalation.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use triage::outcome::PipelineOutcome;
use triage::pipeline::DecisionPipeline;

use crate::notifier::{escalation_message, EscalationNotifier};
use crate::validate::validate_question;

/// Application state shared across handlers.
pub struct AppState {
    pub pipeline: Arc<DecisionPipeline>,
    pub notifier: Arc<dyn EscalationNotifier>,
}

type AppStateArc = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub chapter: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub result: PipelineOutcome,
}

/// Build the service router.
pub fn router(state: AppStateArc) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/ask-question", post(ask_question))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "Tutor Triage Student Support Engine",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "ask_question": "/ask-question"
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn ask_question(
    State(state): State<AppStateArc>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<Value>)> {
    if let Err(err) = validate_question(&req.question, &req.subject, &req.chapter) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": err.to_string()})),
        ));
    }

    // Detached task: a client disconnect drops this handler future, but the
    // in-flight provider call still completes or times out normally, and
    // the escalation side effect still fires.
    let task = tokio::spawn(async move {
        let outcome = state
            .pipeline
            .handle(&req.question, &req.subject, &req.chapter)
            .await;

        if let Some(reason) = outcome.escalation_reason() {
            let (subject_line, body) =
                escalation_message(&req.question, &req.subject, &req.chapter, reason);
            if let Err(err) = state.notifier.notify(&subject_line, &body).await {
                warn!(%err, "escalation notification failed");
            }
        }

        outcome
    });

    match task.await {
        Ok(outcome) => Ok(Json(AskResponse { result: outcome })),
        Err(err) => {
            error!(%err, "pipeline task aborted");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            ))
        }
    }
}

/// Run the HTTP server until shutdown.
pub async fn run(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
