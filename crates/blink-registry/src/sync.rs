use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blink_bus::{Bus, BusMessage, RegistryKind, Topic};
use blink_core::RegistryItem;
use blink_supervisor::{Service, ServiceError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::registry::{load_directory, Registry};

/// How often the syncer rebuilds its from-disk snapshot and diffs it
/// against the live registry.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// A long-running service (C12) that periodically rescans `directory`,
/// diffs the result against `registry`, and publishes `Register`/
/// `Unregister` intents for the difference. It never mutates `registry`
/// directly — applying those intents is the job of whichever service
/// owns the registry and is subscribed to `Topic::Sync`.
pub struct Syncer<T> {
    name: String,
    kind: RegistryKind,
    directory: PathBuf,
    registry: Arc<Registry<T>>,
    bus: Arc<Bus>,
}

impl<T> Syncer<T>
where
    T: RegistryItem + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, kind: RegistryKind, directory: PathBuf, registry: Arc<Registry<T>>, bus: Arc<Bus>) -> Self {
        Self {
            name: name.into(),
            kind,
            directory,
            registry,
            bus,
        }
    }

    /// Runs one sync cycle: build a fresh snapshot from disk, diff it
    /// against the live registry, and publish the difference.
    pub async fn sync_once(&self) {
        let (items, load_error) = load_directory::<T>(&self.directory);
        if let Some(error) = load_error {
            warn!(directory = %self.directory.display(), %error, "directory scan encountered errors, continuing best-effort");
        }

        let snapshot = Registry::new();
        for item in items {
            let name = item.name().to_string();
            if snapshot.register(item).is_err() {
                warn!(name, "duplicate name within one directory scan, keeping first");
            }
        }

        let diff = self.registry.diff(&snapshot);

        for added in diff.to_add {
            let config = match serde_json::to_value(added.as_ref()) {
                Ok(value) => Arc::new(value),
                Err(error) => {
                    warn!(%error, "failed to serialize plug-in config for sync publish, skipping");
                    continue;
                }
            };
            self.bus
                .publish(
                    Topic::Sync,
                    BusMessage::Register {
                        kind: self.kind,
                        name: added.name().to_string(),
                        config,
                    },
                )
                .await;
        }

        for deleted in diff.to_delete {
            self.bus
                .publish(
                    Topic::Sync,
                    BusMessage::Unregister {
                        kind: self.kind,
                        name: deleted,
                    },
                )
                .await;
        }
    }
}

#[async_trait]
impl<T> Service for Syncer<T>
where
    T: RegistryItem + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), ServiceError> {
        loop {
            self.sync_once().await;
            info!(directory = %self.directory.display(), "sync cycle complete");
            tokio::time::sleep(SYNC_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Item {
        name: String,
        description: String,
        enabled: bool,
    }

    impl RegistryItem for Item {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            &self.description
        }
        fn enabled(&self) -> bool {
            self.enabled
        }
    }

    #[tokio::test]
    async fn sync_publishes_register_for_new_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.toml"),
            "name = \"a\"\ndescription = \"\"\nenabled = true\n",
        )
        .unwrap();

        let registry: Arc<Registry<Item>> = Arc::new(Registry::new());
        let bus = Arc::new(Bus::new());
        let mut handle = bus.subscribe(Topic::Sync, true);

        let syncer = Syncer::new("test-syncer", RegistryKind::Rule, dir.path().to_path_buf(), registry, bus);
        syncer.sync_once().await;

        let message = handle.recv().await.unwrap();
        match message {
            BusMessage::Register { kind, name, .. } => {
                assert_eq!(kind, RegistryKind::Rule);
                assert_eq!(name, "a");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_publishes_unregister_for_removed_item() {
        let dir = tempfile::tempdir().unwrap();
        let registry: Arc<Registry<Item>> = Arc::new(Registry::new());
        registry
            .register(Item {
                name: "gone".into(),
                description: String::new(),
                enabled: true,
            })
            .unwrap();

        let bus = Arc::new(Bus::new());
        let mut handle = bus.subscribe(Topic::Sync, true);

        let syncer = Syncer::new("test-syncer", RegistryKind::Rule, dir.path().to_path_buf(), registry, bus);
        syncer.sync_once().await;

        let message = handle.recv().await.unwrap();
        match message {
            BusMessage::Unregister { kind, name } => {
                assert_eq!(kind, RegistryKind::Rule);
                assert_eq!(name, "gone");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
