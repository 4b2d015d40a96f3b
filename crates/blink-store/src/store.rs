use async_trait::async_trait;
use blink_core::Alert;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::record::AlertRecord;

/// Storage contract every concrete driver must satisfy. Keyed by
/// `(rule_name, alert_id)`; all mutating operations are idempotent so a
/// retried call after a crash or a dropped connection never corrupts
/// state.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn add_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError>;

    async fn delete_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError>;

    async fn update_sent_outputs(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn mark_as_dispatched(&self, alert: &Alert, dispatched: DateTime<Utc>) -> Result<(), StoreError>;

    async fn get_alert_record(&self, rule_name: &str, alert_id: Uuid) -> Result<Option<AlertRecord>, StoreError>;

    /// Only alerts whose `dispatched` is unset or older than `now -
    /// in_progress_timeout` are returned — anything more recent is
    /// presumed still in flight from a concurrent dispatch attempt.
    async fn get_alert_records(&self, rule_name: &str, in_progress_timeout: chrono::Duration) -> Result<Vec<AlertRecord>, StoreError>;

    /// Unique rule names currently represented in the store, order
    /// unspecified.
    async fn rule_names(&self) -> Result<Vec<String>, StoreError>;
}
