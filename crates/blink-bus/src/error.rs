use thiserror::Error;

/// `Publish` and `Subscribe` never fail (§4.1); this exists only so that
/// call sites which wrap bus operations in a `Result` have a concrete
/// error type to name, and so a future fallible variant doesn't need a
/// breaking type change.
#[derive(Debug, Error)]
pub enum BusError {}
