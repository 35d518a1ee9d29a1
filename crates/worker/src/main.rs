//! Manifest-driven batch worker.
//!
//! Reads a panel manifest exported by the document store, processes
//! every panel through the orchestrator, and writes the results back
//! out. `DATABASE_URL` is optional: without it the job ledger and the
//! prediction audit trail are disabled and processing runs untracked.

use std::sync::Arc;

use panelworks_db::JobLedger;
use panelworks_events::EventBus;
use panelworks_inference::local::{HttpDetectionProvider, HttpImageFetcher, LocalAnalyzer};
use panelworks_inference::remote::RemoteAnalyzer;
use panelworks_inference::transport::HttpRemoteTransport;
use panelworks_pipeline::{PanelOrchestrator, PanelStore, PipelineConfig};
use panelworks_worker::manifest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "panelworks_worker=info,panelworks_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let manifest_path = args.next().unwrap_or_else(|| "panels.json".to_string());
    let output_path = args
        .next()
        .unwrap_or_else(|| format!("{manifest_path}.processed.json"));

    let config = PipelineConfig::from_env();

    let pool = match std::env::var("DATABASE_URL") {
        Ok(url) => Some(panelworks_db::create_pool(&url).await?),
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; job ledger and prediction audit disabled");
            None
        }
    };
    let ledger = pool.clone().map(JobLedger::new);
    let report_ledger = ledger.clone();

    let http = reqwest::Client::new();
    let transport = Arc::new(HttpRemoteTransport::with_client(
        http.clone(),
        env_or("ANALYSIS_API_URL", "http://localhost:8787"),
    ));
    let remote = Arc::new(
        RemoteAnalyzer::new(transport, ledger)
            .with_timeout_ms(config.request_timeout_ms)
            .with_max_attempts(config.max_attempts),
    );
    let local = Arc::new(LocalAnalyzer::new(
        Arc::new(HttpImageFetcher::new(http.clone())),
        Arc::new(HttpDetectionProvider::new(
            "primary",
            http.clone(),
            env_or("PRIMARY_RUNTIME_URL", "http://127.0.0.1:7860/detect"),
        )),
        Arc::new(HttpDetectionProvider::new(
            "secondary",
            http,
            env_or("SECONDARY_RUNTIME_URL", "http://127.0.0.1:7861/detect"),
        )),
        pool,
    ));

    let store = PanelStore::new();
    let panels = manifest::load(&manifest_path).await?;
    tracing::info!(count = panels.len(), manifest = %manifest_path, "Loaded panel manifest");
    store.replace_all(panels).await;

    let orchestrator = PanelOrchestrator::new(
        Arc::clone(&store),
        remote,
        local,
        Arc::new(EventBus::default()),
        config,
    );

    let outcome = orchestrator.process_all().await;
    tracing::info!(summary = %outcome.summary(), "Batch finished");

    let panels = store.snapshot().await;

    // Per-panel job history for anything that ended in error.
    if let Some(ledger) = report_ledger {
        for panel in panels.iter().filter(|p| p.is_error) {
            let jobs = ledger.jobs_for_panel(panel.id).await;
            if let Some(latest) = jobs.first() {
                tracing::warn!(
                    panel_id = %panel.id,
                    job_id = latest.id,
                    attempts = latest.attempt_count,
                    error = latest.error_message.as_deref().unwrap_or("<none>"),
                    "Panel failed; latest ledger entry",
                );
            }
        }
    }

    manifest::save_results(&output_path, &panels).await?;
    tracing::info!(output = %output_path, "Wrote processed panels");

    Ok(())
}
