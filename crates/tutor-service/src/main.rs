use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use triage::budget::{BudgetLedger, BudgetStore, MemoryBudgetStore, PostgresBudgetStore};
use triage::completion::ChatCompletionClient;
use triage::config::TriageConfig;
use triage::pipeline::DecisionPipeline;
use triage::retrieval::SyllabusIndex;

use tutor_service::notifier::{EscalationNotifier, LogNotifier, MailConfig, MailgunNotifier};
use tutor_service::server::{self, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP front door to
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Path to the syllabus TOML file
    #[arg(long, default_value = "syllabus.toml")]
    syllabus: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = TriageConfig::from_env();

    let index = SyllabusIndex::load(&args.syllabus)
        .with_context(|| format!("loading syllabus from {}", args.syllabus.display()))?;
    info!(documents = index.len(), "syllabus index ready");

    // Cluster deployments share counters through Postgres; without a
    // database the caps still hold within this process.
    let store: Arc<dyn BudgetStore> = match std::env::var("BUDGET_DATABASE_URL") {
        Ok(url) => Arc::new(
            PostgresBudgetStore::connect(&url)
                .await
                .context("connecting budget store")?,
        ),
        Err(_) => {
            warn!("BUDGET_DATABASE_URL not set, using in-memory budget counters");
            Arc::new(MemoryBudgetStore::new())
        }
    };
    let ledger = Arc::new(BudgetLedger::new(
        store,
        config.daily_token_budget,
        config.hourly_token_budget,
    ));

    let provider = Arc::new(ChatCompletionClient::new(&config.provider));

    let notifier: Arc<dyn EscalationNotifier> = match MailConfig::from_env() {
        Some(mail) => Arc::new(MailgunNotifier::new(mail)),
        None => {
            warn!("mail not configured, escalations will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let pipeline = Arc::new(DecisionPipeline::new(
        Arc::new(index),
        provider,
        ledger,
        &config,
    ));

    info!(
        listen = %args.listen,
        model = %config.provider.model,
        daily_budget = config.daily_token_budget,
        hourly_budget = config.hourly_token_budget,
        "tutor-triage service starting"
    );

    server::run(AppState { pipeline, notifier }, &args.listen).await
}
