use blink_bus::{BusMessage, RegistryKind};
use blink_core::RegistryItem;
use blink_registry::Registry;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Applies one `Topic::Sync` message to `registry` iff it's tagged for
/// `kind`; every pipeline stage keeps its own replica of whichever
/// registries it needs and filters the shared sync stream down to the
/// kinds it cares about.
pub fn apply_sync_message<T>(registry: &Registry<T>, kind: RegistryKind, msg: &BusMessage)
where
    T: RegistryItem + DeserializeOwned,
{
    match msg {
        BusMessage::Register { kind: msg_kind, name, config } if *msg_kind == kind => {
            match serde_json::from_value::<T>((**config).clone()) {
                Ok(item) => {
                    if registry.contains(name) {
                        let _ = registry.unregister(name);
                    }
                    if let Err(error) = registry.register(item) {
                        warn!(%name, %error, "failed to apply sync registration");
                    }
                }
                Err(error) => warn!(%name, %error, "failed to deserialize sync config"),
            }
        }
        BusMessage::Unregister { kind: msg_kind, name } if *msg_kind == kind => {
            let _ = registry.unregister(name);
        }
        _ => {}
    }
}
