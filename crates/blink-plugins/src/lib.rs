//! Worked-example plug-ins (§4.12, supplemental/non-core) plus the
//! config-driven static plug-in loader (§4.13). Matchers, enrichments,
//! formatters and dispatchers here are a closed, small set — extending
//! the vocabulary means adding an enum variant, not registering a new
//! type at runtime, per the spec's choice to scope dynamic `.so` loading
//! out entirely.

mod dispatcher;
mod enrichment;
mod error;
mod formatter;
mod loader;
mod matcher;

pub use dispatcher::{Dispatcher, DispatcherKind, DispatcherSpec};
pub use enrichment::{Enrichment, EnrichmentRule, EnrichmentSpec};
pub use error::{DispatcherError, EnrichmentError, EnrichmentTimeout, FormatterError, LoadError, MatcherError};
pub use formatter::{FormatterRule, FormatterSpec};
pub use loader::{PluginLoader, TomlPluginLoader};
pub use matcher::{MatcherRule, MatcherSpec};
