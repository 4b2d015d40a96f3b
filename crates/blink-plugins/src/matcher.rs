use blink_core::{Event, RegistryItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Matchers are a closed set of config-driven rules rather than a dynamic
/// trait-object registry: the spec scopes out dynamic `.so` loading, so
/// extending the matcher vocabulary means adding a `MatcherRule` variant,
/// not registering a new type at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherSpec {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub rule: MatcherRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherRule {
    /// `AwsGuardDutyMatcher`-style: true iff `event.first_match(field) == value`.
    FieldEquals { field: String, value: Value },
}

impl MatcherSpec {
    pub fn evaluate(&self, event: &Event) -> bool {
        match &self.rule {
            MatcherRule::FieldEquals { field, value } => &event.first_match(field, Value::Null) == value,
        }
    }
}

impl RegistryItem for MatcherSpec {
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
