use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blink_bus::{Bus, BusMessage, RegistryKind, Topic};
use blink_core::{Alert, Rule};
use blink_plugins::{Enrichment, EnrichmentSpec};
use blink_registry::Registry;
use blink_supervisor::{Service, ServiceError};
use tracing::{debug, warn};

use crate::sync_apply::apply_sync_message;

/// Per-enrichment deadline (C8). A stuck lookup is skipped rather than
/// allowed to stall the rest of the chain.
pub const ENRICHMENT_DEADLINE: Duration = Duration::from_secs(30);

/// The enricher (C8): runs an alert's rule's named enrichments
/// sequentially, each under its own deadline, then forwards to the
/// tuner. A failing or timed-out enrichment is logged and skipped —
/// it never drops the alert.
pub struct Enricher {
    rules: Arc<Registry<Rule>>,
    enrichments: Arc<Registry<EnrichmentSpec>>,
    bus: Arc<Bus>,
}

impl Enricher {
    pub fn new(rules: Arc<Registry<Rule>>, enrichments: Arc<Registry<EnrichmentSpec>>, bus: Arc<Bus>) -> Self {
        Self { rules, enrichments, bus }
    }

    async fn handle_alert(&self, mut alert: Alert) {
        let Some(rule) = self.rules.get(&alert.rule_name) else {
            warn!(rule = %alert.rule_name, "rule not found at enrichment stage, dropping alert");
            return;
        };

        for name in &rule.enrichments {
            let Some(enrichment) = self.enrichments.get(name) else {
                warn!(enrichment = %name, "enrichment not found, skipping");
                continue;
            };
            if !enrichment.enabled() {
                continue;
            }
            match tokio::time::timeout(ENRICHMENT_DEADLINE, enrichment.apply(&mut alert)).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!(enrichment = %name, %error, "enrichment failed, continuing"),
                Err(_) => {
                    let timeout = blink_plugins::EnrichmentTimeout { name: name.clone() };
                    warn!(%timeout, "enrichment step exceeded its deadline, continuing");
                }
            }
        }

        debug!(alert = %alert.id, "enrichment complete, forwarding to tuner");
        self.bus.publish(Topic::Tuner, BusMessage::Alert(alert)).await;
    }
}

#[async_trait]
impl Service for Enricher {
    fn name(&self) -> &str {
        "enricher"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        let mut alerts = self.bus.subscribe(Topic::Enricher, true);
        let mut sync = self.bus.subscribe(Topic::Sync, false);

        loop {
            tokio::select! {
                msg = alerts.recv() => {
                    match msg {
                        Some(BusMessage::Alert(alert)) => self.handle_alert(alert).await,
                        Some(_) => {}
                        None => break,
                    }
                }
                msg = sync.recv() => {
                    match msg {
                        Some(msg) => {
                            apply_sync_message(&self.rules, RegistryKind::Rule, &msg);
                            apply_sync_message(&self.enrichments, RegistryKind::Enrichment, &msg);
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}
