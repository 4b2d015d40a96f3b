//! Entry point for the `rule-engine` process: loads the rule and matcher
//! registries, runs the rule engine against incoming events, and serves
//! the health endpoint every binary in this workspace mounts.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use blink_bus::{Bus, RegistryKind};
use blink_concurrency::WorkerPool;
use blink_config::PipelineConfig;
use blink_core::Rule;
use blink_pipeline::RuleEngine;
use blink_plugins::MatcherSpec;
use blink_registry::{Registry, Syncer};
use blink_supervisor::Supervisor;
use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(about = "Matches events against rules and emits alerts")]
struct Args {
    /// Path to a TOML config file. Environment variables under the
    /// `BLINK_` prefix always take priority over values from this file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config: PipelineConfig = match blink_config::load("BLINK_", args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("rule-engine: invalid configuration: {error}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("rule-engine: failed to start the tokio runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "rule-engine exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: PipelineConfig) -> anyhow::Result<()> {
    let bus = Arc::new(Bus::new());

    let rules: Arc<Registry<Rule>> = Arc::new(Registry::new());
    let matchers: Arc<Registry<MatcherSpec>> = Arc::new(Registry::new());

    let rule_syncer = Syncer::new("rule-syncer", RegistryKind::Rule, config.rules_dir.clone(), rules.clone(), bus.clone());
    let matcher_syncer = Syncer::new("matcher-syncer", RegistryKind::Matcher, config.matchers_dir.clone(), matchers.clone(), bus.clone());
    let pool = Arc::new(WorkerPool::new(config.worker_pool_size));
    let engine = RuleEngine::new(rules, matchers, bus.clone(), pool);

    let mut supervisor = Supervisor::new();
    supervisor.add_long_running(Arc::new(rule_syncer));
    supervisor.add_long_running(Arc::new(matcher_syncer));
    supervisor.add_long_running(Arc::new(engine));

    let handles = supervisor.run().await.context("failed to start rule-engine services")?;

    let listener = tokio::net::TcpListener::bind(&config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind http listener on {}", config.http_bind_addr))?;
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, blink_http::router(config.http_rate_limit_per_sec)).await {
            error!(%error, "http server exited");
        }
    });

    futures::future::join_all(handles).await;
    Ok(())
}
