//! Fan-out publish/subscribe bus (C1). Topics are a small closed enum;
//! each subscription picks a blocking or non-blocking backpressure policy
//! at subscribe time, and that choice never changes for the life of the
//! handle.

mod bus;
mod error;
mod message;
mod topic;

pub use bus::{Bus, ReadHandle, QUEUE_CAPACITY};
pub use error::BusError;
pub use message::BusMessage;
pub use topic::{RegistryKind, Topic};
