use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::scoring::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningKind {
    Ignore,
    SetConfidence,
    IncreaseConfidence,
    DecreaseConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// Applies to any rule, not just rules that name it explicitly.
    pub global: bool,
    pub kind: TuningKind,
    pub confidence: Confidence,
    /// Matcher predicate: which alerts this rule applies to. A `None`
    /// predicate (the common case for hand-authored config) always applies
    /// once the rule is `enabled`.
    #[serde(skip)]
    pub predicate: Option<TuningPredicate>,
}

/// A tuning rule's applicability check. Kept out of the `TuningRule`
/// serde shape because it's a runtime-bound closure, not config data; the
/// loader attaches it after deserializing the descriptor.
pub type TuningPredicate = std::sync::Arc<dyn Fn(&Alert) -> bool + Send + Sync>;

impl TuningRule {
    /// `Tune(alert) -> bool`. A disabled rule never applies.
    pub fn applies(&self, alert: &Alert) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.predicate {
            Some(predicate) => predicate(alert),
            None => true,
        }
    }
}

impl crate::registry::RegistryItem for TuningRule {
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

/// The sentinel meaning "suppress this alert" (Phase 1 Ignore match).
pub type TuningOutcome = Option<Confidence>;

/// Combine a rule's own tuning rules plus all global ones into a final
/// confidence, via the three-phase algorithm from the spec:
///
/// 1. Any applicable `Ignore` rule short-circuits to `None` (suppress).
/// 2. Any applicable `SetConfidence` rule sets `running = max(running, rule)`;
///    if at least one applied, that's the answer.
/// 3. Otherwise, `IncreaseConfidence`/`DecreaseConfidence` rules nudge the
///    alert's own confidence up or down, each only if it moves the value
///    further in its direction.
pub fn process_tuning_rules(alert: &Alert, rules: &[TuningRule]) -> TuningOutcome {
    for rule in rules {
        if rule.kind == TuningKind::Ignore && rule.applies(alert) {
            return None;
        }
    }

    let mut running = alert.confidence;
    let mut set_confidence_applied = false;
    for rule in rules {
        if rule.kind == TuningKind::SetConfidence && rule.applies(alert) {
            set_confidence_applied = true;
            if rule.confidence > running {
                running = rule.confidence;
            }
        }
    }
    if set_confidence_applied {
        return Some(running);
    }

    for rule in rules {
        match rule.kind {
            TuningKind::IncreaseConfidence if rule.applies(alert) && rule.confidence > running => {
                running = rule.confidence;
            }
            TuningKind::DecreaseConfidence if rule.applies(alert) && rule.confidence < running => {
                running = rule.confidence;
            }
            _ => {}
        }
    }
    Some(running)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::test_support::sample_alert;

    fn rule(name: &str, kind: TuningKind, confidence: Confidence, enabled: bool) -> TuningRule {
        TuningRule {
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            enabled,
            global: false,
            kind,
            confidence,
            predicate: None,
        }
    }

    #[test]
    fn no_rules_returns_original_confidence() {
        let alert = sample_alert(Confidence::Medium);
        assert_eq!(process_tuning_rules(&alert, &[]), Some(Confidence::Medium));
    }

    #[test]
    fn ignore_rule_suppresses_regardless_of_order() {
        let alert = sample_alert(Confidence::High);
        let rules = vec![
            rule("set", TuningKind::SetConfidence, Confidence::VeryHigh, true),
            rule("ignore", TuningKind::Ignore, Confidence::Low, true),
        ];
        assert_eq!(process_tuning_rules(&alert, &rules), None);
    }

    #[test]
    fn disabled_ignore_rule_does_not_suppress() {
        let alert = sample_alert(Confidence::High);
        let rules = vec![rule("ignore", TuningKind::Ignore, Confidence::Low, false)];
        assert_eq!(process_tuning_rules(&alert, &rules), Some(Confidence::High));
    }

    #[test]
    fn set_confidence_takes_max_and_skips_phase_three() {
        let alert = sample_alert(Confidence::Low);
        let rules = vec![
            rule("set_a", TuningKind::SetConfidence, Confidence::Medium, true),
            rule("set_b", TuningKind::SetConfidence, Confidence::High, true),
            rule("decrease", TuningKind::DecreaseConfidence, Confidence::VeryLow, true),
        ];
        // Phase 2 wins with max(medium, high) = high; phase 3 never runs.
        assert_eq!(process_tuning_rules(&alert, &rules), Some(Confidence::High));
    }

    #[test]
    fn increase_only_applies_if_it_raises_confidence() {
        let alert = sample_alert(Confidence::Medium);
        let rules = vec![rule("inc", TuningKind::IncreaseConfidence, Confidence::Low, true)];
        // Low < Medium, so the increase rule doesn't fire.
        assert_eq!(process_tuning_rules(&alert, &rules), Some(Confidence::Medium));

        let rules = vec![rule("inc", TuningKind::IncreaseConfidence, Confidence::VeryHigh, true)];
        assert_eq!(process_tuning_rules(&alert, &rules), Some(Confidence::VeryHigh));
    }

    #[test]
    fn decrease_only_applies_if_it_lowers_confidence() {
        let alert = sample_alert(Confidence::Medium);
        let rules = vec![rule("dec", TuningKind::DecreaseConfidence, Confidence::High, true)];
        assert_eq!(process_tuning_rules(&alert, &rules), Some(Confidence::Medium));

        let rules = vec![rule("dec", TuningKind::DecreaseConfidence, Confidence::VeryLow, true)];
        assert_eq!(process_tuning_rules(&alert, &rules), Some(Confidence::VeryLow));
    }
}
