use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blink_bus::{Bus, BusMessage, Topic};
use blink_core::{Alert, Event, Rule};
use blink_registry::Registry;
use blink_store::{AlertRecord, AlertStore};
use blink_supervisor::{Service, ServiceError};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Upper bound on how many pending records are fetched per rule per
/// sweep (`L`).
pub const FETCH_LIMIT: usize = 5000;
/// Upper bound on how many alerts one merge group may contain (`G`).
pub const MAX_GROUP_SIZE: usize = 50;

/// The alert merger (C11): periodically scans the store for alerts whose
/// outputs aren't all sent yet, dispatching immediately whenever a rule
/// still has a required output pending, otherwise folding mergeable
/// alerts into closed merge groups and dispatching one merged alert per
/// group. Alerts that have already reached every output and don't merge
/// are swept away.
pub struct AlertMerger {
    rules: Arc<Registry<Rule>>,
    store: Arc<dyn AlertStore>,
    bus: Arc<Bus>,
    sweep_interval: Duration,
    in_progress_timeout: chrono::Duration,
}

impl AlertMerger {
    pub fn new(rules: Arc<Registry<Rule>>, store: Arc<dyn AlertStore>, bus: Arc<Bus>, sweep_interval: Duration, in_progress_timeout: chrono::Duration) -> Self {
        Self {
            rules,
            store,
            bus,
            sweep_interval,
            in_progress_timeout,
        }
    }

    async fn sweep_once(&self) {
        let rule_names = match self.store.rule_names().await {
            Ok(names) => names,
            Err(error) => {
                warn!(%error, "failed to list rule names for merge sweep");
                return;
            }
        };

        for rule_name in rule_names {
            self.sweep_rule(&rule_name).await;
        }
    }

    async fn sweep_rule(&self, rule_name: &str) {
        let Some(rule) = self.rules.get(rule_name) else {
            debug!(rule = %rule_name, "rule no longer registered, skipping merge sweep for it");
            return;
        };

        let records = match self.store.get_alert_records(rule_name, self.in_progress_timeout).await {
            Ok(records) => records,
            Err(error) => {
                warn!(rule = %rule_name, %error, "failed to fetch alert records for merge sweep");
                return;
            }
        };

        let required_outputs: HashSet<&String> = rule.dispatchers.iter().collect();
        let mut to_delete = Vec::new();
        let mut merge_pool = Vec::new();

        for record in records.into_iter().take(FETCH_LIMIT) {
            let sent: HashSet<&String> = record.alert.outputs_sent.iter().collect();
            let remaining = required_outputs.iter().any(|name| !sent.contains(*name));
            if remaining {
                self.bus.publish(Topic::Dispatcher, BusMessage::Alert(record.alert)).await;
            } else if rule.merge_enabled() {
                merge_pool.push(record);
            } else {
                to_delete.push(record.alert);
            }
        }

        if !to_delete.is_empty() {
            if let Err(error) = self.store.delete_alerts(&to_delete).await {
                warn!(rule = %rule_name, %error, "failed to delete fully-dispatched alerts");
            }
        }

        if merge_pool.is_empty() {
            return;
        }

        let closed_groups = partition_into_closed_groups(&rule, merge_pool, Utc::now());
        for group in closed_groups {
            self.dispatch_merged_group(&rule, group).await;
        }
    }

    async fn dispatch_merged_group(&self, rule: &Rule, group: Vec<AlertRecord>) {
        if group.len() == 1 {
            let alert = group.into_iter().next().expect("checked len == 1").alert;
            self.bus.publish(Topic::Dispatcher, BusMessage::Alert(alert)).await;
            return;
        }

        let originals: Vec<Alert> = group.iter().map(|record| record.alert.clone()).collect();
        let merged = merge_group(rule, &group);

        if let Err(error) = self.store.add_alerts(std::slice::from_ref(&merged)).await {
            warn!(rule = %rule.name, %error, "failed to persist merged alert");
            return;
        }
        if let Err(error) = self.store.delete_alerts(&originals).await {
            warn!(rule = %rule.name, %error, "failed to delete merged-away originals");
        }
        self.bus.publish(Topic::Dispatcher, BusMessage::Alert(merged)).await;
    }
}

#[async_trait]
impl Service for AlertMerger {
    fn name(&self) -> &str {
        "alert-merger"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        loop {
            self.sweep_once().await;
            tokio::time::sleep(self.sweep_interval).await;
        }
    }
}

fn can_merge(rule: &Rule, a: &AlertRecord, b: &AlertRecord) -> bool {
    let Some(window) = rule.merge_window else { return false };
    let Some(keys) = &rule.merge_by_keys else { return false };

    let window = chrono::Duration::seconds(window.as_secs() as i64);
    if (a.alert.created_at - b.alert.created_at).abs() > window {
        return false;
    }
    keys.iter().all(|key| a.alert.event.first_match(key, Value::Null) == b.alert.event.first_match(key, Value::Null))
}

/// Groups `candidates` by repeated `CanMerge(candidate, group.first)`
/// checks, each group capped at [`MAX_GROUP_SIZE`], then returns only
/// the groups whose window has already elapsed ("closed"). Groups still
/// within their window are left untouched in the store for the next
/// sweep to reconsider.
fn partition_into_closed_groups(rule: &Rule, mut candidates: Vec<AlertRecord>, now: DateTime<Utc>) -> Vec<Vec<AlertRecord>> {
    candidates.sort_by_key(|record| record.alert.created_at);

    let mut groups: Vec<Vec<AlertRecord>> = Vec::new();
    for record in candidates {
        let home = groups.iter_mut().find(|group| group.len() < MAX_GROUP_SIZE && can_merge(rule, &record, &group[0]));
        match home {
            Some(group) => group.push(record),
            None => groups.push(vec![record]),
        }
    }

    let Some(window) = rule.merge_window else { return Vec::new() };
    let window = chrono::Duration::seconds(window.as_secs() as i64);

    groups.into_iter().filter(|group| now >= group[0].alert.created_at + window).collect()
}

fn clean_event(rule: &Rule, event: &Event) -> Map<String, Value> {
    match &rule.merge_by_keys {
        Some(keys) => event.clean(keys).into_map(),
        None => event.as_map().clone(),
    }
}

fn common_fields(cleaned: &[Map<String, Value>]) -> Map<String, Value> {
    let mut common = Map::new();
    if let Some(first) = cleaned.first() {
        for (key, value) in first {
            if cleaned.iter().all(|map| map.get(key) == Some(value)) {
                common.insert(key.clone(), value.clone());
            }
        }
    }
    common
}

/// The merge algorithm (§4.10): folds a closed group into one alert
/// carrying the first member's identity plus the aggregate fields
/// (`alert_count`, `alert_time_first`, `alert_time_last`, `merged_by`,
/// `other_common_keys`, `value_diffs`).
fn merge_group(rule: &Rule, group: &[AlertRecord]) -> Alert {
    let merge_keys = rule.merge_by_keys.clone().unwrap_or_default();
    let cleaned: Vec<Map<String, Value>> = group.iter().map(|record| clean_event(rule, &record.alert.event)).collect();
    let common = common_fields(&cleaned);

    let mut value_diffs = Map::new();
    for (record, cleaned_event) in group.iter().zip(&cleaned) {
        let diff = blink_core::Event::from_map(cleaned_event.clone()).diff(&common);
        if !diff.is_empty() {
            value_diffs.insert(record.alert.created_at.to_rfc3339(), Value::Object(diff));
        }
    }

    let first = &group[0].alert;
    let merged_by: Map<String, Value> = merge_keys
        .iter()
        .map(|key| (key.clone(), first.event.first_match(key, json!("N/A"))))
        .collect();

    let mut merged_event = Map::new();
    merged_event.insert("alert_count".to_string(), json!(group.len()));
    merged_event.insert("alert_time_first".to_string(), json!(group.first().unwrap().alert.created_at.to_rfc3339()));
    merged_event.insert("alert_time_last".to_string(), json!(group.last().unwrap().alert.created_at.to_rfc3339()));
    merged_event.insert("merged_by".to_string(), Value::Object(merged_by));
    merged_event.insert("other_common_keys".to_string(), Value::Object(common));
    merged_event.insert("value_diffs".to_string(), Value::Object(value_diffs));

    let staged = group.iter().any(|record| record.alert.staged);

    Alert::new(
        first.rule_id.clone(),
        first.rule_name.clone(),
        first.title.clone(),
        first.description.clone(),
        first.severity,
        first.confidence,
        Event::from_map(merged_event),
        Utc::now(),
    )
    .with_provenance(
        first.cluster.clone(),
        first.log_source.clone(),
        first.log_type.clone(),
        first.source_entity.clone(),
        first.source_service.clone(),
        staged,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use blink_core::{Confidence, Severity};

    fn merge_rule() -> Rule {
        Rule {
            id: "r1".into(),
            name: "repeated_login_failure".into(),
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
            dispatchers: vec!["stdout".into()],
            merge_by_keys: Some(vec!["user".into()]),
            merge_window: Some(Duration::from_secs(300)),
            signal: true,
            signal_threshold: Confidence::Medium,
        }
    }

    fn record_at(user: &str, ip: &str, created_at: DateTime<Utc>) -> AlertRecord {
        let event = Event::from_map(json!({"user": user, "src_ip": ip}).as_object().unwrap().clone());
        let alert = Alert::new("r1", "repeated_login_failure", "t", "d", Severity::Medium, Confidence::Medium, event, created_at);
        AlertRecord::new(alert)
    }

    #[test]
    fn alerts_sharing_merge_keys_within_window_form_one_group() {
        let rule = merge_rule();
        let now = Utc::now();
        let candidates = vec![
            record_at("alice", "1.1.1.1", now - chrono::Duration::seconds(100)),
            record_at("alice", "2.2.2.2", now - chrono::Duration::seconds(50)),
        ];
        let closed = partition_into_closed_groups(&rule, candidates, now);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].len(), 2);
    }

    #[test]
    fn alerts_with_different_merge_key_values_form_separate_groups() {
        let rule = merge_rule();
        let now = Utc::now();
        let candidates = vec![
            record_at("alice", "1.1.1.1", now - chrono::Duration::seconds(400)),
            record_at("bob", "2.2.2.2", now - chrono::Duration::seconds(400)),
        ];
        let closed = partition_into_closed_groups(&rule, candidates, now);
        assert_eq!(closed.len(), 2);
    }

    #[test]
    fn group_still_within_its_window_is_not_closed() {
        let rule = merge_rule();
        let now = Utc::now();
        let candidates = vec![record_at("alice", "1.1.1.1", now - chrono::Duration::seconds(10))];
        let closed = partition_into_closed_groups(&rule, candidates, now);
        assert!(closed.is_empty());
    }

    #[test]
    fn merged_alert_carries_aggregate_fields_and_value_diffs() {
        let rule = merge_rule();
        let now = Utc::now();
        let group = vec![
            record_at("alice", "1.1.1.1", now - chrono::Duration::seconds(200)),
            record_at("alice", "2.2.2.2", now - chrono::Duration::seconds(100)),
        ];
        let merged = merge_group(&rule, &group);

        assert_eq!(merged.event.get("alert_count", Value::Null), json!(2));
        let merged_by = merged.event.get("merged_by", Value::Null);
        assert_eq!(merged_by.get("user"), Some(&json!("alice")));
        let diffs = merged.event.get("value_diffs", Value::Null);
        assert_eq!(diffs.as_object().unwrap().len(), 2);
    }
}
