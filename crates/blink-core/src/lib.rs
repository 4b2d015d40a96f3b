//! Shared data model for the blink alert pipeline.
//!
//! Every other crate in the workspace depends on this one for the types
//! that cross stage boundaries: [`Event`], [`Rule`], [`TuningRule`] and
//! [`Alert`], plus the scoring functions that derive risk and signal type
//! from confidence and severity.

pub mod alert;
pub mod error;
pub mod event;
pub mod registry;
pub mod rule;
pub mod scoring;
pub mod tuning;

pub use alert::Alert;
pub use error::CoreError;
pub use event::Event;
pub use registry::RegistryItem;
pub use rule::Rule;
pub use scoring::{risk_score, signal_type, Confidence, RiskScore, Severity, SignalType};
pub use tuning::{process_tuning_rules, TuningKind, TuningOutcome, TuningPredicate, TuningRule};
