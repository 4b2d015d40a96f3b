use thiserror::Error;

/// Fatal at startup (§7): a process refuses to come up on a malformed or
/// incomplete configuration rather than run with guessed defaults for
/// required fields.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration value missing or malformed: {0}")]
    Build(#[source] figment::Error),

    #[error("config file not found at {path}")]
    MissingFile { path: String },
}
