//! Tag-driven configuration binding (ambient stack): environment
//! variables and a TOML file merged onto a typed record via `serde`
//! derives, with environment taking priority. Unsupported field kinds
//! and unset required fields fail fast at startup.

mod error;
mod loader;
mod pipeline;

pub use error::ConfigError;
pub use loader::load;
pub use pipeline::PipelineConfig;
