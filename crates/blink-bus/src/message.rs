use std::sync::Arc;

use blink_core::{Alert, Event};

use crate::topic::RegistryKind;

/// The tagged variant every publish carries. `Register`/`Unregister` ship
/// an opaque config blob rather than a generic `T`: the receiving
/// registry knows how to deserialize its own kind and ignores messages
/// tagged with a different one.
#[derive(Debug, Clone)]
pub enum BusMessage {
    Register {
        kind: RegistryKind,
        name: String,
        config: Arc<serde_json::Value>,
    },
    Unregister {
        kind: RegistryKind,
        name: String,
    },
    Event(Event),
    Alert(Alert),
}

impl BusMessage {
    pub fn registry_kind(&self) -> Option<RegistryKind> {
        match self {
            BusMessage::Register { kind, .. } | BusMessage::Unregister { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
