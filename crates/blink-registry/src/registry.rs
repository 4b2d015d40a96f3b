use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use blink_core::RegistryItem;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::RegistryError;

/// A concurrent map of named, hot-reloadable items, guarded by a single
/// reader-writer lock so readers never observe a torn mix of an old and
/// new generation: `rules_for_log_type`-style scans and `diff` both take
/// the read side, while `register`/`unregister` take the write side.
pub struct Registry<T> {
    items: RwLock<BTreeMap<String, Arc<T>>>,
}

/// The result of comparing two registries by name: what the caller would
/// need to add/remove to turn `self` into `other`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff<T> {
    pub to_add: Vec<Arc<T>>,
    pub to_delete: Vec<String>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T: RegistryItem> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `item` under its own name. Idempotent by design: a
    /// duplicate registration is logged and rejected, never fatal.
    pub fn register(&self, item: T) -> Result<(), RegistryError> {
        let name = item.name().to_string();
        let mut items = self.items.write().expect("registry lock poisoned");
        if items.contains_key(&name) {
            warn!(name = %name, "ignoring duplicate registration");
            return Err(RegistryError::AlreadyRegistered { name });
        }
        items.insert(name, Arc::new(item));
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        let mut items = self.items.write().expect("registry lock poisoned");
        if items.remove(name).is_none() {
            warn!(name, "ignoring unregister of absent item");
            return Err(RegistryError::NotRegistered { name: name.to_string() });
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.items.read().expect("registry lock poisoned").get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.read().expect("registry lock poisoned").contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.read().expect("registry lock poisoned").keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<Arc<T>> {
        self.items.read().expect("registry lock poisoned").values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Computed under read locks on both sides: `to_add` is every item in
    /// `other` absent from `self` (by name), `to_delete` is every name in
    /// `self` absent from `other`. Order within each list is unspecified.
    pub fn diff(&self, other: &Registry<T>) -> Diff<T> {
        let ours = self.items.read().expect("registry lock poisoned");
        let theirs = other.items.read().expect("registry lock poisoned");

        let to_add = theirs
            .iter()
            .filter(|(name, _)| !ours.contains_key(*name))
            .map(|(_, item)| item.clone())
            .collect();
        let to_delete = ours
            .keys()
            .filter(|name| !theirs.contains_key(*name))
            .cloned()
            .collect();

        Diff { to_add, to_delete }
    }
}

/// Walks `directory` non-recursively, parsing every `*.toml` file found
/// into a `T`. Artifacts that fail to parse are logged and skipped; the
/// load is best-effort and keeps going, returning the first error seen
/// (if any) once the whole directory has been scanned.
pub fn load_directory<T>(directory: &Path) -> (Vec<T>, Option<RegistryError>)
where
    T: DeserializeOwned,
{
    let mut loaded = Vec::new();
    let mut first_error = None;

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(source) => {
            return (
                loaded,
                Some(RegistryError::Load {
                    path: directory.display().to_string(),
                    source,
                }),
            )
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<T>(&contents) {
                Ok(item) => loaded.push(item),
                Err(source) => {
                    let error = RegistryError::Parse {
                        path: path.display().to_string(),
                        source,
                    };
                    warn!(path = %path.display(), error = %error, "skipping unparsable plug-in artifact");
                    first_error.get_or_insert(error);
                }
            },
            Err(source) => {
                let error = RegistryError::Load {
                    path: path.display().to_string(),
                    source,
                };
                warn!(path = %path.display(), error = %error, "skipping unreadable plug-in artifact");
                first_error.get_or_insert(error);
            }
        }
    }

    (loaded, first_error)
}
