//! Entry point for the `alert-processor` process: runs the alert merger
//! sweep alongside the alert processor's dispatch loop.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use blink_bus::{Bus, RegistryKind};
use blink_config::PipelineConfig;
use blink_core::Rule;
use blink_pipeline::{AlertMerger, AlertProcessor};
use blink_plugins::{DispatcherSpec, FormatterSpec};
use blink_registry::{Registry, Syncer};
use blink_store::InMemoryAlertStore;
use blink_supervisor::Supervisor;
use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(about = "Merges and dispatches alerts to their configured outputs")]
struct Args {
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config: PipelineConfig = match blink_config::load("BLINK_", args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("alert-processor: invalid configuration: {error}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("alert-processor: failed to start the tokio runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "alert-processor exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: PipelineConfig) -> anyhow::Result<()> {
    let bus = Arc::new(Bus::new());

    let merger_rules: Arc<Registry<Rule>> = Arc::new(Registry::new());
    let processor_rules: Arc<Registry<Rule>> = Arc::new(Registry::new());
    let formatters: Arc<Registry<FormatterSpec>> = Arc::new(Registry::new());
    let dispatchers: Arc<Registry<DispatcherSpec>> = Arc::new(Registry::new());

    let store: Arc<dyn blink_store::AlertStore> = Arc::new(InMemoryAlertStore::new());

    let rule_syncer_a = Syncer::new("merger-rule-syncer", RegistryKind::Rule, config.rules_dir.clone(), merger_rules.clone(), bus.clone());
    let rule_syncer_b = Syncer::new("processor-rule-syncer", RegistryKind::Rule, config.rules_dir.clone(), processor_rules.clone(), bus.clone());
    let formatter_syncer = Syncer::new("formatter-syncer", RegistryKind::Formatter, config.formatters_dir.clone(), formatters.clone(), bus.clone());
    let dispatcher_syncer = Syncer::new("dispatcher-syncer", RegistryKind::Dispatcher, config.dispatchers_dir.clone(), dispatchers.clone(), bus.clone());

    let merger = AlertMerger::new(
        merger_rules,
        store.clone(),
        bus.clone(),
        Duration::from_secs(config.merge_sweep_interval_secs),
        chrono::Duration::seconds(config.in_progress_timeout_secs),
    );
    let processor = AlertProcessor::new(processor_rules, formatters, dispatchers, store, bus.clone());

    let mut supervisor = Supervisor::new();
    supervisor.add_long_running(Arc::new(rule_syncer_a));
    supervisor.add_long_running(Arc::new(rule_syncer_b));
    supervisor.add_long_running(Arc::new(formatter_syncer));
    supervisor.add_long_running(Arc::new(dispatcher_syncer));
    supervisor.add_long_running(Arc::new(merger));
    supervisor.add_long_running(Arc::new(processor));

    let handles = supervisor.run().await.context("failed to start alert-processor services")?;
    futures::future::join_all(handles).await;
    Ok(())
}
