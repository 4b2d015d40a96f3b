use std::sync::Arc;

use async_trait::async_trait;
use blink_bus::{Bus, BusMessage, RegistryKind, Topic};
use blink_concurrency::WorkerPool;
use blink_core::{Alert, Event, Rule};
use blink_plugins::MatcherSpec;
use blink_registry::Registry;
use blink_supervisor::{Service, ServiceError};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::sync_apply::apply_sync_message;

/// The rule engine (C7): for every event on [`Topic::Event`], finds the
/// rules whose `log_types` cover it, then runs each candidate rule's gate
/// chain (required-subkey gate, matcher gate, per-rule evaluate) and
/// alert emission as an independent task on the worker pool (C2), since
/// one rule's gates never depend on another rule's outcome.
pub struct RuleEngine {
    rules: Arc<Registry<Rule>>,
    matchers: Arc<Registry<MatcherSpec>>,
    bus: Arc<Bus>,
    pool: Arc<WorkerPool>,
}

impl RuleEngine {
    pub fn new(rules: Arc<Registry<Rule>>, matchers: Arc<Registry<MatcherSpec>>, bus: Arc<Bus>, pool: Arc<WorkerPool>) -> Self {
        Self { rules, matchers, bus, pool }
    }

    fn candidate_rules(&self, log_type: &str) -> Vec<Arc<Rule>> {
        self.rules
            .all()
            .into_iter()
            .filter(|rule| rule.enabled && rule.log_types.iter().any(|lt| lt == log_type))
            .collect()
    }

    fn passes_subkey_gate(rule: &Rule, event: &Event) -> bool {
        rule.required_subkeys.iter().all(|key| !event.first_match(key, Value::Null).is_null())
    }

    fn passes_matcher_gate(matchers: &Registry<MatcherSpec>, rule: &Rule, event: &Event) -> bool {
        for matcher_name in &rule.matchers {
            let Some(matcher) = matchers.get(matcher_name) else {
                warn!(rule = %rule.name, matcher = %matcher_name, "matcher not found, skipping rule");
                return false;
            };
            if !matcher.enabled() {
                continue;
            }
            if !matcher.evaluate(event) {
                return false;
            }
        }
        true
    }

    /// Stands in for the original per-rule custom predicate. Rules here
    /// are config data, not compiled code, so there's nothing left for a
    /// per-rule `Evaluate` step to veto beyond what the matcher chain
    /// already gates on; kept as an explicit step so the pipeline stays
    /// legible against the gate sequence rather than silently folding it
    /// into the matcher gate above.
    fn evaluate(_rule: &Rule, _event: &Event) -> bool {
        true
    }

    fn build_alert(rule: &Rule, event: &Event) -> Alert {
        let now = Utc::now();
        let cluster = as_string(event.first_match("cluster", Value::Null));
        let log_source = as_string(event.first_match("log_source", Value::Null));
        let log_type = as_string(event.first_match("log_type", Value::Null));
        let source_entity = as_string(event.first_match("source_entity", Value::Null));
        let source_service = as_string(event.first_match("source_service", Value::Null));
        let staged = event.first_match("staged", Value::Bool(false)).as_bool().unwrap_or(false);

        Alert::new(rule.id.clone(), rule.name.clone(), rule.name.clone(), rule.description.clone(), rule.severity, rule.confidence, event.clone(), now)
            .with_provenance(cluster, log_source, log_type, source_entity, source_service, staged)
    }

    async fn handle_event(&self, event: Event) {
        let log_type = event.first_match("log_type", Value::Null);
        let Some(log_type) = log_type.as_str() else {
            debug!("event missing log_type, dropping");
            return;
        };

        let candidates = self.candidate_rules(log_type);
        let matchers = self.matchers.clone();
        let bus = self.bus.clone();

        let tasks = candidates.into_iter().map(move |rule| {
            let event = event.clone();
            let matchers = matchers.clone();
            let bus = bus.clone();
            async move {
                if !Self::passes_subkey_gate(&rule, &event) {
                    return;
                }
                if !Self::passes_matcher_gate(&matchers, &rule, &event) {
                    return;
                }
                if !Self::evaluate(&rule, &event) {
                    return;
                }

                let alert = Self::build_alert(&rule, &event);
                bus.publish(Topic::Enricher, BusMessage::Alert(alert)).await;
            }
        });

        self.pool.execute(tasks).await;
    }
}

fn as_string(value: Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

#[async_trait]
impl Service for RuleEngine {
    fn name(&self) -> &str {
        "rule-engine"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        let mut events = self.bus.subscribe(Topic::Event, true);
        let mut sync = self.bus.subscribe(Topic::Sync, false);

        loop {
            tokio::select! {
                msg = events.recv() => {
                    match msg {
                        Some(BusMessage::Event(event)) => self.handle_event(event).await,
                        Some(_) => {}
                        None => break,
                    }
                }
                msg = sync.recv() => {
                    match msg {
                        Some(msg) => apply_sync_message(&self.rules, RegistryKind::Rule, &msg),
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}
