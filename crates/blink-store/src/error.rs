use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no alert record for rule {rule_name:?} id {alert_id}")]
    NotFound { rule_name: String, alert_id: uuid::Uuid },

    #[error("store I/O failure: {0}")]
    Io(#[source] std::io::Error),
}
