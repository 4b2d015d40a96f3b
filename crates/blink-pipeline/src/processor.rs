use std::sync::Arc;

use async_trait::async_trait;
use blink_bus::{Bus, BusMessage, RegistryKind, Topic};
use blink_core::{Alert, Rule};
use blink_plugins::{Dispatcher, DispatcherSpec, FormatterSpec};
use blink_registry::Registry;
use blink_store::AlertStore;
use blink_supervisor::{Service, ServiceError};
use chrono::Utc;
use tracing::warn;

use crate::sync_apply::apply_sync_message;

/// The alert processor (C10): for each named dispatcher on the alert's
/// rule, runs the formatter chain against a copy of the event and then
/// dispatches. Outcomes are tracked per output so a partial failure
/// doesn't lose the alerts that did succeed, and the store is only
/// mutated once every outcome for this round is known.
pub struct AlertProcessor {
    rules: Arc<Registry<Rule>>,
    formatters: Arc<Registry<FormatterSpec>>,
    dispatchers: Arc<Registry<DispatcherSpec>>,
    store: Arc<dyn AlertStore>,
    bus: Arc<Bus>,
}

impl AlertProcessor {
    pub fn new(rules: Arc<Registry<Rule>>, formatters: Arc<Registry<FormatterSpec>>, dispatchers: Arc<Registry<DispatcherSpec>>, store: Arc<dyn AlertStore>, bus: Arc<Bus>) -> Self {
        Self {
            rules,
            formatters,
            dispatchers,
            store,
            bus,
        }
    }

    async fn handle_alert(&self, mut alert: Alert) {
        let Some(rule) = self.rules.get(&alert.rule_name) else {
            warn!(rule = %alert.rule_name, "rule not found at processing stage, dropping alert");
            return;
        };

        if rule.dispatchers.is_empty() {
            warn!(rule = %rule.name, "rule has no dispatchers configured, nothing to do");
            return;
        }

        if let Err(error) = self.store.mark_as_dispatched(&alert, Utc::now()).await {
            warn!(alert = %alert.id, %error, "failed to mark alert as dispatched, continuing anyway");
        }

        let mut any_success = false;
        let mut any_failure = false;

        for dispatcher_name in &rule.dispatchers {
            if alert.already_sent_to(dispatcher_name) {
                any_success = true;
                continue;
            }

            let Some(dispatcher) = self.dispatchers.get(dispatcher_name) else {
                warn!(dispatcher = %dispatcher_name, "dispatcher not found, treating as failed output");
                any_failure = true;
                continue;
            };
            if !dispatcher.enabled() {
                continue;
            }

            let mut formatted_event = alert.event.clone();
            for formatter_name in &rule.formatters {
                let Some(formatter) = self.formatters.get(formatter_name) else {
                    warn!(formatter = %formatter_name, "formatter not found, skipping");
                    continue;
                };
                if !formatter.enabled() {
                    continue;
                }
                if let Err(error) = formatter.format(&mut formatted_event) {
                    warn!(formatter = %formatter_name, %error, "formatter failed, continuing with prior event");
                }
            }
            let mut outbound = alert.clone();
            outbound.event = formatted_event;

            // Spawned and joined rather than awaited in place so a panicking
            // dispatcher fails only this output instead of unwinding the
            // whole processor task (which the supervisor would then restart,
            // dropping every other output still due this round).
            let dispatch_outcome = {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.dispatch(&outbound).await }).await
            };

            match dispatch_outcome {
                Ok(Ok(())) => {
                    alert.record_sent(dispatcher_name.clone());
                    any_success = true;
                }
                Ok(Err(error)) => {
                    warn!(dispatcher = %dispatcher_name, %error, "dispatch failed");
                    any_failure = true;
                }
                Err(join_error) => {
                    warn!(dispatcher = %dispatcher_name, panicked = join_error.is_panic(), "dispatch task ended abnormally, treating as failed output");
                    any_failure = true;
                }
            }
        }

        self.update_store(&rule, &alert, any_success, any_failure).await;
    }

    async fn update_store(&self, rule: &Rule, alert: &Alert, any_success: bool, any_failure: bool) {
        if any_success && !any_failure && !rule.merge_enabled() {
            if let Err(error) = self.store.delete_alerts(std::slice::from_ref(alert)).await {
                warn!(alert = %alert.id, %error, "failed to delete fully-dispatched alert");
            }
        } else if any_success {
            if let Err(error) = self.store.update_sent_outputs(alert).await {
                warn!(alert = %alert.id, %error, "failed to persist partial dispatch outcome");
            }
        }
        // No output succeeded: leave the record untouched so the next
        // merge sweep retries it once the in-progress window elapses.
    }
}

#[async_trait]
impl Service for AlertProcessor {
    fn name(&self) -> &str {
        "alert-processor"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        let mut alerts = self.bus.subscribe(Topic::Dispatcher, true);
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
                            apply_sync_message(&self.formatters, RegistryKind::Formatter, &msg);
                            apply_sync_message(&self.dispatchers, RegistryKind::Dispatcher, &msg);
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blink_core::{Confidence, Event, Severity};
    use blink_plugins::DispatcherKind;
    use blink_store::InMemoryAlertStore;

    fn rule_with_dispatchers(names: Vec<String>) -> Rule {
        Rule {
            id: "r1".into(),
            name: "suspicious_login".into(),
            description: String::new(),
            enabled: true,
            severity: Severity::Medium,
            confidence: Confidence::Medium,
            log_types: vec![],
            required_subkeys: vec![],
            matchers: vec![],
            enrichments: vec![],
            tuning_rules: vec![],
            formatters: vec![],
            dispatchers: names,
            merge_by_keys: None,
            merge_window: None,
            signal: true,
            signal_threshold: Confidence::Medium,
        }
    }

    fn alert() -> Alert {
        Alert::new("r1", "suspicious_login", "t", "d", Severity::Medium, Confidence::Medium, Event::new(), Utc::now())
    }

    #[tokio::test]
    async fn successful_dispatch_to_every_output_deletes_the_alert() {
        let rules = Arc::new(Registry::new());
        rules.register(rule_with_dispatchers(vec!["stdout".into()])).unwrap();
        let formatters = Arc::new(Registry::new());
        let dispatchers = Arc::new(Registry::new());
        dispatchers
            .register(DispatcherSpec {
                name: "stdout".into(),
                description: String::new(),
                enabled: true,
                kind: DispatcherKind::Stdout,
            })
            .unwrap();
        let store: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
        let alert_to_store = alert();
        store.add_alerts(&[alert_to_store.clone()]).await.unwrap();

        let bus = Arc::new(Bus::new());
        let processor = AlertProcessor::new(rules, formatters, dispatchers, store.clone(), bus);
        processor.handle_alert(alert_to_store).await;

        assert!(store.rule_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_dispatcher_leaves_the_record_for_retry() {
        let rules = Arc::new(Registry::new());
        rules.register(rule_with_dispatchers(vec!["missing".into()])).unwrap();
        let formatters = Arc::new(Registry::new());
        let dispatchers = Arc::new(Registry::new());
        let store: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
        let alert_to_store = alert();
        store.add_alerts(&[alert_to_store.clone()]).await.unwrap();

        let bus = Arc::new(Bus::new());
        let processor = AlertProcessor::new(rules, formatters, dispatchers, store.clone(), bus);
        processor.handle_alert(alert_to_store).await;

        assert_eq!(store.rule_names().await.unwrap().len(), 1);
    }
}
