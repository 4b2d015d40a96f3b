use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::SupervisorError;
use crate::service::Service;

/// Cooling-off delay before restarting a long-running service that returned,
/// whether it returned `Ok(())` or `Err(_)`.
pub const RESTART_COOLDOWN: Duration = Duration::from_secs(5);

/// Owns two populations of services: init services are awaited together
/// at startup, then long-running services are spawned and individually
/// restarted forever.
#[derive(Default)]
pub struct Supervisor {
    init_services: Vec<Arc<dyn Service>>,
    long_running: Vec<Arc<dyn Service>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_init(&mut self, service: Arc<dyn Service>) {
        self.init_services.push(service);
    }

    pub fn add_long_running(&mut self, service: Arc<dyn Service>) {
        self.long_running.push(service);
    }

    /// Runs every init service concurrently and waits for all of them;
    /// the first failure is surfaced once every other init service has
    /// also finished. Then spawns every long-running service into its own
    /// restart loop and returns the join handles so the caller can await
    /// process shutdown.
    pub async fn run(&self) -> Result<Vec<tokio::task::JoinHandle<()>>, SupervisorError> {
        let mut init_set = JoinSet::new();
        for service in &self.init_services {
            let service = service.clone();
            init_set.spawn(async move {
                let name = service.name().to_string();
                let result = service.run().await;
                (name, result)
            });
        }

        let mut first_failure = None;
        while let Some(joined) = init_set.join_next().await {
            let (name, result) = joined.expect("init service task panicked");
            match result {
                Ok(()) => info!(service = %name, "init service completed"),
                Err(source) => {
                    error!(service = %name, error = %source, "init service failed");
                    first_failure.get_or_insert(crate::error::SupervisorError::InitFailed { name, source });
                }
            }
        }
        if let Some(failure) = first_failure {
            return Err(failure);
        }

        let handles = self
            .long_running
            .iter()
            .cloned()
            .map(spawn_restart_loop)
            .collect();
        Ok(handles)
    }
}

fn spawn_restart_loop(service: Arc<dyn Service>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let name = service.name().to_string();
            match service.run().await {
                Ok(()) => warn!(service = %name, "long-running service returned, restarting after cooldown"),
                Err(error) => error!(service = %name, %error, "long-running service failed, restarting after cooldown"),
            }
            tokio::time::sleep(RESTART_COOLDOWN).await;
        }
    })
}
