//! Bus-wired pipeline stages: rule engine (C7), enricher (C8), tuner
//! (C9), alert merger (C11) and alert processor (C10). Each stage is a
//! [`blink_supervisor::Service`] that owns its own registry replicas,
//! kept current by filtering the shared `Topic::Sync` stream down to
//! the registry kinds it cares about.

mod enricher;
mod merger;
mod processor;
mod rule_engine;
mod sync_apply;
mod tuner;

pub use enricher::{Enricher, ENRICHMENT_DEADLINE};
pub use merger::{AlertMerger, FETCH_LIMIT, MAX_GROUP_SIZE};
pub use processor::AlertProcessor;
pub use rule_engine::RuleEngine;
pub use sync_apply::apply_sync_message;
pub use tuner::Tuner;
