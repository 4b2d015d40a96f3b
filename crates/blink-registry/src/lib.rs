//! Hot-reloadable registry (C3) plus the directory-diff syncer (C12).
//!
//! `Registry<T>` is a read/write-fenced concurrent map: readers (rule
//! lookups, diffs) and writers (register/unregister) never observe a torn
//! generation of the underlying items.

mod error;
mod registry;
mod sync;

pub use error::RegistryError;
pub use registry::{load_directory, Diff, Registry};
pub use sync::{Syncer, SYNC_INTERVAL};
