//! Entry point for the `alert-engine` process: runs the enricher and
//! tuner stages, handing surviving alerts off to the store for the
//! alert-processor process to pick up.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use blink_bus::{Bus, RegistryKind};
use blink_config::PipelineConfig;
use blink_core::{Rule, TuningRule};
use blink_pipeline::{Enricher, Tuner};
use blink_plugins::EnrichmentSpec;
use blink_registry::{Registry, Syncer};
use blink_store::InMemoryAlertStore;
use blink_supervisor::Supervisor;
use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(about = "Enriches and tunes alerts produced by the rule engine")]
struct Args {
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config: PipelineConfig = match blink_config::load("BLINK_", args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("alert-engine: invalid configuration: {error}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("alert-engine: failed to start the tokio runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "alert-engine exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: PipelineConfig) -> anyhow::Result<()> {
    let bus = Arc::new(Bus::new());

    // The enricher and the tuner each keep their own replica of the rule
    // registry; a rule's enrichment/tuning-rule names are only meaningful
    // to the stage that reads them.
    let enricher_rules: Arc<Registry<Rule>> = Arc::new(Registry::new());
    let tuner_rules: Arc<Registry<Rule>> = Arc::new(Registry::new());
    let enrichments: Arc<Registry<EnrichmentSpec>> = Arc::new(Registry::new());
    let tuning_rules: Arc<Registry<TuningRule>> = Arc::new(Registry::new());

    // InMemoryAlertStore is process-local; a deployment that runs
    // alert-engine and alert-processor as separate processes needs
    // AlertStore backed by something durable and shared, which this
    // workspace doesn't ship a driver for.
    let store: Arc<dyn blink_store::AlertStore> = Arc::new(InMemoryAlertStore::new());

    let rule_syncer_a = Syncer::new("enricher-rule-syncer", RegistryKind::Rule, config.rules_dir.clone(), enricher_rules.clone(), bus.clone());
    let rule_syncer_b = Syncer::new("tuner-rule-syncer", RegistryKind::Rule, config.rules_dir.clone(), tuner_rules.clone(), bus.clone());
    let enrichment_syncer = Syncer::new("enrichment-syncer", RegistryKind::Enrichment, config.enrichments_dir.clone(), enrichments.clone(), bus.clone());
    let tuning_syncer = Syncer::new("tuning-rule-syncer", RegistryKind::TuningRule, config.tuning_rules_dir.clone(), tuning_rules.clone(), bus.clone());

    let enricher = Enricher::new(enricher_rules, enrichments, bus.clone());
    let tuner = Tuner::new(tuner_rules, tuning_rules, store, bus.clone());

    let mut supervisor = Supervisor::new();
    supervisor.add_long_running(Arc::new(rule_syncer_a));
    supervisor.add_long_running(Arc::new(rule_syncer_b));
    supervisor.add_long_running(Arc::new(enrichment_syncer));
    supervisor.add_long_running(Arc::new(tuning_syncer));
    supervisor.add_long_running(Arc::new(enricher));
    supervisor.add_long_running(Arc::new(tuner));

    let handles = supervisor.run().await.context("failed to start alert-engine services")?;
    futures::future::join_all(handles).await;
    Ok(())
}
