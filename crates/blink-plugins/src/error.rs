use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("matcher {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

/// A distinct variant (rather than a field on `EnrichmentError`) so the
/// enricher can special-case it per §4.7 ("emit a typed `EnrichmentTimeout`
/// and continue") without string-matching an error message.
#[derive(Debug, Error)]
#[error("enrichment {name} exceeded its step deadline")]
pub struct EnrichmentTimeout {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum FormatterError {
    #[error("formatter {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("dispatcher {name} failed: {source}")]
    Transport {
        name: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("dispatcher {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
