use blink_core::{Event, RegistryItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormatterError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterSpec {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub rule: FormatterRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatterRule {
    /// `UppercaseFormatter`-style: upper-cases a named top-level string field.
    Uppercase { field: String },
}

impl FormatterSpec {
    pub fn format(&self, event: &mut Event) -> Result<(), FormatterError> {
        match &self.rule {
            FormatterRule::Uppercase { field } => {
                let current = event.get(field, Value::Null);
                if let Some(text) = current.as_str() {
                    event.insert(field.clone(), Value::String(text.to_uppercase()));
                }
                Ok(())
            }
        }
    }
}

impl RegistryItem for FormatterSpec {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn enabled(&self) -> bool {
        self.enabled
    }
}
