use std::collections::BTreeMap;

use async_trait::async_trait;
use blink_core::Alert;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::record::AlertRecord;
use crate::store::AlertStore;

/// Reference driver used by tests, examples and local/dev runs. Not
/// durable across process restarts — a real deployment backs `AlertStore`
/// with an actual database.
#[derive(Default)]
pub struct InMemoryAlertStore {
    records: RwLock<BTreeMap<(String, Uuid), AlertRecord>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn add_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        let mut records = self.records.write();
        for alert in alerts {
            let key = (alert.rule_name.clone(), alert.id);
            records.entry(key).or_insert_with(|| AlertRecord::new(alert.clone()));
        }
        Ok(())
    }

    async fn delete_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        let mut records = self.records.write();
        for alert in alerts {
            records.remove(&(alert.rule_name.clone(), alert.id));
        }
        Ok(())
    }

    async fn update_sent_outputs(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let key = (alert.rule_name.clone(), alert.id);
        match records.get_mut(&key) {
            Some(record) => {
                record.alert.outputs_sent = alert.outputs_sent.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                rule_name: alert.rule_name.clone(),
                alert_id: alert.id,
            }),
        }
    }

    async fn mark_as_dispatched(&self, alert: &Alert, dispatched: DateTime<Utc>) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let key = (alert.rule_name.clone(), alert.id);
        match records.get_mut(&key) {
            Some(record) => {
                record.attempts += 1;
                record.dispatched = Some(dispatched);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                rule_name: alert.rule_name.clone(),
                alert_id: alert.id,
            }),
        }
    }

    async fn get_alert_record(&self, rule_name: &str, alert_id: Uuid) -> Result<Option<AlertRecord>, StoreError> {
        Ok(self.records.read().get(&(rule_name.to_string(), alert_id)).cloned())
    }

    async fn get_alert_records(&self, rule_name: &str, in_progress_timeout: chrono::Duration) -> Result<Vec<AlertRecord>, StoreError> {
        let now = Utc::now();
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|record| record.alert.rule_name == rule_name)
            .filter(|record| match record.dispatched {
                Some(dispatched) => now - dispatched > in_progress_timeout,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn rule_names(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.read();
        let mut names: Vec<String> = records.keys().map(|(rule_name, _)| rule_name.clone()).collect();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blink_core::{Confidence, Event, Severity};

    fn sample_alert(rule_name: &str) -> Alert {
        Alert::new(
            "r1",
            rule_name,
            "title",
            "description",
            Severity::Medium,
            Confidence::Medium,
            Event::new(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn add_is_idempotent_upsert() {
        let store = InMemoryAlertStore::new();
        let alert = sample_alert("rule_a");
        store.add_alerts(&[alert.clone()]).await.unwrap();
        store.add_alerts(&[alert.clone()]).await.unwrap();
        let records = store.get_alert_records("rule_a", chrono::Duration::seconds(0)).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn delete_absent_key_is_not_an_error() {
        let store = InMemoryAlertStore::new();
        let alert = sample_alert("rule_a");
        store.delete_alerts(&[alert]).await.unwrap();
    }

    #[tokio::test]
    async fn update_sent_outputs_fails_on_absent_alert() {
        let store = InMemoryAlertStore::new();
        let alert = sample_alert("rule_a");
        assert!(store.update_sent_outputs(&alert).await.is_err());
    }

    #[tokio::test]
    async fn get_alert_records_excludes_recently_dispatched() {
        let store = InMemoryAlertStore::new();
        let alert = sample_alert("rule_a");
        store.add_alerts(&[alert.clone()]).await.unwrap();
        store.mark_as_dispatched(&alert, Utc::now()).await.unwrap();

        let in_flight = store.get_alert_records("rule_a", chrono::Duration::seconds(30)).await.unwrap();
        assert!(in_flight.is_empty());

        let expired = store.get_alert_records("rule_a", chrono::Duration::seconds(0)).await.unwrap();
        assert_eq!(expired.len(), 1);
    }

    #[tokio::test]
    async fn rule_names_lists_unique_rules() {
        let store = InMemoryAlertStore::new();
        store.add_alerts(&[sample_alert("rule_a"), sample_alert("rule_b")]).await.unwrap();
        let mut names = store.rule_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["rule_a".to_string(), "rule_b".to_string()]);
    }
}
