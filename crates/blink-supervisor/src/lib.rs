//! Service lifecycle supervisor (C5): init services are awaited together
//! at startup, long-running services run forever and are restarted with a
//! fixed cooldown whenever they return, success or failure alike.

mod error;
mod service;
mod supervisor;

pub use error::{ServiceError, SupervisorError};
pub use service::Service;
pub use supervisor::{Supervisor, RESTART_COOLDOWN};
