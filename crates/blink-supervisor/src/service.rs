use async_trait::async_trait;

use crate::error::ServiceError;

/// A unit of background work the supervisor owns. `run` is expected to
/// either run forever (long-running services) or return once its one-shot
/// work is done (init services) — which class a service belongs to is a
/// property of how it's registered with the [`Supervisor`](crate::supervisor::Supervisor),
/// not of the trait itself.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), ServiceError>;
}
