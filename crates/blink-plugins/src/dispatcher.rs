use std::time::Duration;

use async_trait::async_trait;
use blink_core::{Alert, RegistryItem};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DispatcherError;

/// Default per-attempt timeout for the webhook dispatcher.
const WEBHOOK_TIMEOUT: Duration = Duration::from_millis(3050);
/// Ceiling on delivery attempts before a webhook dispatch is reported failed.
const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSpec {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub kind: DispatcherKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatcherKind {
    /// Writes the alert as a JSON line to stdout. Always succeeds unless
    /// serialization itself fails.
    Stdout,
    /// POSTs the alert as JSON to `url`.
    Webhook { url: String },
}

#[async_trait]
pub trait Dispatcher: RegistryItem + Send + Sync {
    async fn dispatch(&self, alert: &Alert) -> Result<(), DispatcherError>;
}

#[async_trait]
impl Dispatcher for DispatcherSpec {
    async fn dispatch(&self, alert: &Alert) -> Result<(), DispatcherError> {
        match &self.kind {
            DispatcherKind::Stdout => {
                let line = serde_json::to_string(alert).map_err(|error| DispatcherError::Failed {
                    name: self.name.clone(),
                    reason: error.to_string(),
                })?;
                println!("{line}");
                Ok(())
            }
            DispatcherKind::Webhook { url } => {
                let client = reqwest::Client::builder()
                    .timeout(WEBHOOK_TIMEOUT)
                    .build()
                    .map_err(|source| DispatcherError::Transport {
                        name: self.name.clone(),
                        source,
                    })?;

                let mut attempt = 0;
                loop {
                    attempt += 1;
                    let result = client
                        .post(url)
                        .json(alert)
                        .send()
                        .await
                        .and_then(reqwest::Response::error_for_status);

                    match result {
                        Ok(_) => return Ok(()),
                        Err(source) if attempt >= MAX_ATTEMPTS => {
                            return Err(DispatcherError::Transport {
                                name: self.name.clone(),
                                source,
                            })
                        }
                        Err(source) => {
                            let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                            warn!(name = %self.name, attempt, %source, "webhook dispatch failed, retrying after backoff");
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            }
        }
    }
}

impl RegistryItem for DispatcherSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blink_core::{Confidence, Event, Severity};
    use chrono::Utc;

    fn alert() -> Alert {
        Alert::new("r1", "rule", "title", "desc", Severity::Low, Confidence::Low, Event::new(), Utc::now())
    }

    #[tokio::test]
    async fn stdout_dispatch_always_succeeds() {
        let spec = DispatcherSpec {
            name: "stdout".into(),
            description: String::new(),
            enabled: true,
            kind: DispatcherKind::Stdout,
        };
        assert!(spec.dispatch(&alert()).await.is_ok());
    }
}
