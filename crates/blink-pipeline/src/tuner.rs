use std::sync::Arc;

use async_trait::async_trait;
use blink_bus::{Bus, BusMessage, RegistryKind, Topic};
use blink_core::{process_tuning_rules, Alert, Rule, TuningRule};
use blink_registry::Registry;
use blink_store::AlertStore;
use blink_supervisor::{Service, ServiceError};
use tracing::{debug, warn};

use crate::sync_apply::apply_sync_message;

/// The tuner (C9): resolves the rule's own tuning rules plus every
/// `global` one, folds them through [`process_tuning_rules`], and
/// either drops the alert (an `Ignore` rule fired) or carries the
/// resolved confidence forward. Alerts that clear the rule's own
/// signal threshold are persisted to the store and forwarded to
/// [`Topic::Alert`]; alerts that don't are dropped without being
/// stored, since nothing downstream acts on them.
pub struct Tuner {
    rules: Arc<Registry<Rule>>,
    tuning_rules: Arc<Registry<TuningRule>>,
    store: Arc<dyn AlertStore>,
    bus: Arc<Bus>,
}

impl Tuner {
    pub fn new(rules: Arc<Registry<Rule>>, tuning_rules: Arc<Registry<TuningRule>>, store: Arc<dyn AlertStore>, bus: Arc<Bus>) -> Self {
        Self { rules, tuning_rules, store, bus }
    }

    fn applicable_tuning_rules(&self, rule: &Rule) -> Vec<TuningRule> {
        self.tuning_rules
            .all()
            .iter()
            .filter(|tr| tr.enabled && (tr.global || rule.tuning_rules.iter().any(|name| name == &tr.name)))
            .map(|tr| (**tr).clone())
            .collect()
    }

    async fn handle_alert(&self, mut alert: Alert) {
        let Some(rule) = self.rules.get(&alert.rule_name) else {
            warn!(rule = %alert.rule_name, "rule not found at tuning stage, dropping alert");
            return;
        };

        let applicable = self.applicable_tuning_rules(&rule);
        let Some(confidence) = process_tuning_rules(&alert, &applicable) else {
            debug!(alert = %alert.id, rule = %rule.name, "tuning rule suppressed alert");
            return;
        };
        alert.confidence = confidence;
        // `signal` only governs external surfacing at the processor; a
        // tuned alert is always persisted and forwarded from here.
        alert.signal = rule.signal && rule.signal_threshold <= alert.confidence;

        if let Err(error) = self.store.add_alerts(std::slice::from_ref(&alert)).await {
            warn!(alert = %alert.id, %error, "failed to persist tuned alert");
        }
        self.bus.publish(Topic::Alert, BusMessage::Alert(alert)).await;
    }
}

#[async_trait]
impl Service for Tuner {
    fn name(&self) -> &str {
        "tuner"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        let mut alerts = self.bus.subscribe(Topic::Tuner, true);
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
                            apply_sync_message(&self.tuning_rules, RegistryKind::TuningRule, &msg);
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
    use blink_core::{Confidence, Event, Severity, TuningKind};
    use blink_store::InMemoryAlertStore;
    use chrono::Utc;

    fn rule(signal_threshold: Confidence, tuning_rules: Vec<String>) -> Rule {
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
            tuning_rules,
            formatters: vec![],
            dispatchers: vec![],
            merge_by_keys: None,
            merge_window: None,
            signal: true,
            signal_threshold,
        }
    }

    fn alert() -> Alert {
        Alert::new("r1", "suspicious_login", "t", "d", Severity::Medium, Confidence::Medium, Event::new(), Utc::now())
    }

    fn tuning_rule(name: &str, global: bool, kind: TuningKind, confidence: Confidence) -> TuningRule {
        TuningRule {
            id: name.into(),
            name: name.into(),
            description: String::new(),
            enabled: true,
            global,
            kind,
            confidence,
            predicate: None,
        }
    }

    #[tokio::test]
    async fn alert_above_threshold_is_stored_and_forwarded() {
        let rules = Arc::new(Registry::new());
        rules.register(rule(Confidence::Medium, vec![])).unwrap();
        let tuning_rules = Arc::new(Registry::new());
        let store: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
        let bus = Arc::new(Bus::new());
        let mut forwarded = bus.subscribe(Topic::Alert, true);

        let tuner = Tuner::new(rules, tuning_rules, store.clone(), bus.clone());
        tuner.handle_alert(alert()).await;

        assert!(forwarded.recv().await.is_some());
        assert_eq!(store.rule_names().await.unwrap(), vec!["suspicious_login".to_string()]);
    }

    #[tokio::test]
    async fn ignore_rule_drops_alert_without_storing() {
        let rules = Arc::new(Registry::new());
        rules.register(rule(Confidence::Medium, vec!["suppress".into()])).unwrap();
        let tuning_rules = Arc::new(Registry::new());
        tuning_rules.register(tuning_rule("suppress", false, TuningKind::Ignore, Confidence::Low)).unwrap();
        let store: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
        let bus = Arc::new(Bus::new());

        let tuner = Tuner::new(rules, tuning_rules, store.clone(), bus.clone());
        tuner.handle_alert(alert()).await;

        assert!(store.rule_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn below_threshold_after_tuning_is_stored_and_forwarded_without_signal() {
        let rules = Arc::new(Registry::new());
        rules.register(rule(Confidence::VeryHigh, vec![])).unwrap();
        let tuning_rules = Arc::new(Registry::new());
        let store: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
        let bus = Arc::new(Bus::new());
        let mut forwarded = bus.subscribe(Topic::Alert, true);

        let tuner = Tuner::new(rules, tuning_rules, store.clone(), bus.clone());
        tuner.handle_alert(alert()).await;

        match forwarded.recv().await {
            Some(BusMessage::Alert(alert)) => assert!(!alert.signal),
            other => panic!("expected an alert, got {other:?}"),
        }
        let records = store.get_alert_records("suspicious_login", chrono::Duration::seconds(0)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].alert.signal);
    }
}
