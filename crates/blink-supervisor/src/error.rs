use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service {name} failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("init service {name} failed")]
    InitFailed { name: String, #[source] source: ServiceError },
}
