use std::path::PathBuf;

use serde::Deserialize;

fn default_worker_pool_size() -> usize {
    8
}

fn default_in_progress_timeout_secs() -> i64 {
    300
}

fn default_merge_sweep_interval_secs() -> u64 {
    30
}

fn default_http_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_http_rate_limit_per_sec() -> u32 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Deployment-level knobs shared by all three binaries. Plug-in
/// directories are required (a process with nowhere to load rules from
/// isn't meaningfully configured); everything else has a sane default.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub rules_dir: PathBuf,
    pub tuning_rules_dir: PathBuf,
    pub matchers_dir: PathBuf,
    pub enrichments_dir: PathBuf,
    pub formatters_dir: PathBuf,
    pub dispatchers_dir: PathBuf,

    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// `T_proc`: how long an alert may sit with a recent `dispatched`
    /// timestamp before a pipeline worker is allowed to check it out
    /// again (the at-most-once-in-flight guard).
    #[serde(default = "default_in_progress_timeout_secs")]
    pub in_progress_timeout_secs: i64,

    #[serde(default = "default_merge_sweep_interval_secs")]
    pub merge_sweep_interval_secs: u64,

    #[serde(default = "default_http_bind_addr")]
    pub http_bind_addr: String,

    #[serde(default = "default_http_rate_limit_per_sec")]
    pub http_rate_limit_per_sec: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}
