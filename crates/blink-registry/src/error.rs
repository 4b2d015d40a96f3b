use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("item {name:?} is already registered")]
    AlreadyRegistered { name: String },

    #[error("no item named {name:?} is registered")]
    NotRegistered { name: String },

    #[error("failed to load plug-in artifact at {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plug-in artifact at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
