//! `contreact run`: execute one experimental run.

use super::{build_provider, verify_models};
use contreact_agent::{CycleOrchestrator, RunOutcome, RunSettings};
use contreact_channels::OperatorLink;
use contreact_config::{MemoryBackendKind, RunConfig};
use contreact_core::channel::OperatorChannel;
use contreact_core::embedding::EmbeddingProvider;
use contreact_core::event::EventSink;
use contreact_core::memory::MemoryStore;
use contreact_memory::{FileStore, InMemoryStore};
use contreact_providers::OllamaEmbedder;
use contreact_telemetry::JsonlEventSink;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::load_from(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = build_provider(&config)?;
    verify_models(&provider, &config).await?;

    let store = open_store(&config)?;
    let operator = OperatorLink::from_config(&config.operator.telegram).await?;
    info!(channel = operator.name(), "Operator channel selected");

    let tools = contreact_tools::default_registry(store, Arc::new(operator));

    let sink = Arc::new(JsonlEventSink::open(config.event_log_path())?);
    let mut orchestrator = CycleOrchestrator::new(
        Arc::new(provider),
        tools,
        sink.clone(),
        RunSettings::from(&config),
    );
    if config.diversity.enabled {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbedder::new(
            &config.backend.host,
            &config.diversity.embedding_model,
            Duration::from_secs(config.backend.request_timeout_secs),
        )?);
        orchestrator = orchestrator.with_diversity(embedder);
    }

    println!();
    println!("  ContReAct run '{}'", config.run_id);
    println!("  Model:      {}", config.model_name);
    println!("  Cycles:     {}", config.cycle_count);
    println!("  Event log:  {}", sink.path().display());
    println!();

    let result = orchestrator.run().await;
    // The log is closed whether the run finished or not
    let closed = sink.close().await;

    match result {
        Ok(outcome) => {
            closed?;
            print_outcome(&config, &outcome, sink.path());
            Ok(())
        }
        Err(e) => {
            if let Err(close_err) = closed {
                error!(error = %close_err, "Failed to close event log");
            }
            error!(
                error = %e,
                completed_cycles = orchestrator.reflections().len(),
                "Run terminated"
            );
            Err(format!("Run '{}' terminated: {e}", config.run_id).into())
        }
    }
}

fn open_store(config: &RunConfig) -> Result<Arc<dyn MemoryStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn MemoryStore> = match config.memory.backend {
        MemoryBackendKind::File => Arc::new(FileStore::open(config.memory.path.clone())?),
        MemoryBackendKind::InMemory => Arc::new(InMemoryStore::new()),
    };
    info!(backend = store.name(), "Memory store ready");
    Ok(store)
}

fn print_outcome(config: &RunConfig, outcome: &RunOutcome, log: &Path) {
    println!();
    println!("  Run '{}' complete", config.run_id);
    println!("  Cycles:      {}", outcome.reflections.len());
    println!(
        "  Memory ops:  {}",
        outcome.metrics.iter().map(|m| m.memory_ops_total).sum::<u32>()
    );
    println!(
        "  Operator:    {} message(s)",
        outcome.metrics.iter().map(|m| m.messages_to_operator).sum::<u32>()
    );
    println!("  Advisories:  {}", outcome.advisories_issued);
    println!("  Event log:   {}", log.display());
    println!();
    println!("  Summarize with: contreact summarize {}", log.display());
}
