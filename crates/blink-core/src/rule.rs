use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::scoring::{risk_score, Confidence, RiskScore, Severity};

/// An immutable, checksum-stable detection rule.
///
/// Constructed once by the registry loader and never mutated afterwards;
/// every stage of the pipeline that needs per-rule configuration (matchers,
/// enrichments, tuning rules, formatters, dispatchers) reads it by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub severity: Severity,
    pub confidence: Confidence,
    pub log_types: Vec<String>,
    pub required_subkeys: Vec<String>,
    pub matchers: Vec<String>,
    pub enrichments: Vec<String>,
    pub tuning_rules: Vec<String>,
    pub formatters: Vec<String>,
    pub dispatchers: Vec<String>,
    pub merge_by_keys: Option<Vec<String>>,
    #[serde(with = "duration_secs_opt", default)]
    pub merge_window: Option<Duration>,
    pub signal: bool,
    pub signal_threshold: Confidence,
}

impl Rule {
    pub fn risk_score(&self) -> RiskScore {
        risk_score(self.confidence, self.severity)
    }

    /// Merge is enabled iff both `merge_by_keys` and `merge_window` are set.
    pub fn merge_enabled(&self) -> bool {
        self.merge_by_keys.is_some() && self.merge_window.is_some()
    }

    /// Stable content checksum, computed over the fields that define rule
    /// identity and behavior (not bookkeeping like `id`).
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.description.as_bytes());
        hasher.update([self.enabled as u8]);
        hasher.update(format!("{:?}{:?}", self.severity, self.confidence));
        for field in [
            &self.log_types,
            &self.required_subkeys,
            &self.matchers,
            &self.enrichments,
            &self.tuning_rules,
            &self.formatters,
            &self.dispatchers,
        ] {
            for item in field {
                hasher.update(item.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

impl crate::registry::RegistryItem for Rule {
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

mod duration_secs_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs: Option<u64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> Rule {
        Rule {
            id: "r1".into(),
            name: "suspicious_login".into(),
            description: "flags suspicious logins".into(),
            enabled: true,
            severity: Severity::Low,
            confidence: Confidence::Medium,
            log_types: vec!["aws".into()],
            required_subkeys: vec![],
            matchers: vec![],
            enrichments: vec![],
            tuning_rules: vec![],
            formatters: vec![],
            dispatchers: vec!["stdout".into()],
            merge_by_keys: None,
            merge_window: None,
            signal: true,
            signal_threshold: Confidence::Medium,
        }
    }

    #[test]
    fn risk_score_follows_matrix() {
        let rule = sample_rule();
        assert_eq!(rule.risk_score(), RiskScore::Medium);
    }

    #[test]
    fn merge_requires_both_keys_and_window() {
        let mut rule = sample_rule();
        assert!(!rule.merge_enabled());
        rule.merge_by_keys = Some(vec!["user".into()]);
        assert!(!rule.merge_enabled());
        rule.merge_window = Some(Duration::from_secs(300));
        assert!(rule.merge_enabled());
    }

    #[test]
    fn checksum_is_stable_and_sensitive_to_content() {
        let a = sample_rule();
        let mut b = sample_rule();
        assert_eq!(a.checksum(), b.checksum());
        b.description = "different".into();
        assert_ne!(a.checksum(), b.checksum());
    }
}
