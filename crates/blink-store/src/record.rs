use blink_core::Alert;
use chrono::{DateTime, Utc};

/// What the store actually persists: the alert plus store-only bookkeeping
/// that the pipeline stages never see directly.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub alert: Alert,
    pub attempts: u32,
    pub dispatched: Option<DateTime<Utc>>,
}

impl AlertRecord {
    pub fn new(alert: Alert) -> Self {
        Self {
            alert,
            attempts: 0,
            dispatched: None,
        }
    }

    pub fn key(&self) -> (String, uuid::Uuid) {
        (self.alert.rule_name.clone(), self.alert.id)
    }
}
