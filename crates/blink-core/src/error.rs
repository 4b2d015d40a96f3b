use thiserror::Error;

/// Validation failures for data-model types loaded from config or the wire.
/// Kept separate from the pipeline-stage errors defined in `blink-pipeline`,
/// which wrap these as a `source()` when a stage fails because the data it
/// was handed doesn't satisfy one of these invariants.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("rule {name:?} sets merge_by_keys without merge_window (or vice versa): both or neither")]
    IncompleteMergeConfig { name: String },

    #[error("rule {name:?} has no enabled dispatchers")]
    NoDispatchers { name: String },

    #[error("event is missing required subkey {subkey:?}")]
    MissingSubkey { subkey: String },

    #[error("malformed event payload: {0}")]
    MalformedEvent(#[source] serde_json::Error),
}
