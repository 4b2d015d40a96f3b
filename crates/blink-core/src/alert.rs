use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;
use crate::scoring::{risk_score, Confidence, RiskScore, Severity, SignalType};

/// An alert produced by the rule engine and carried through enrichment,
/// tuning, merging and dispatch. `confidence` and `severity` start as the
/// rule's own values and may be overwritten by the tuner; `risk_score` and
/// `signal_type` are recomputed whenever `confidence` changes rather than
/// stored as independently-mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub rule_id: String,
    pub rule_name: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub event: Event,
    /// Key/value facts attached by enrichment steps, merged into `event`'s
    /// namespace but tracked separately so a failed enrichment step can be
    /// rolled back without touching the raw event.
    pub enrichments: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Set by the processor the moment dispatch begins; used by the
    /// at-most-once guard to detect an alert that's still in flight.
    pub dispatched_at: Option<DateTime<Utc>>,
    /// Formatter/dispatcher pairs that have already succeeded for this
    /// alert, keyed by dispatcher name. Re-dispatch skips names present
    /// here so a retried alert doesn't duplicate prior successful sends.
    pub outputs_sent: Vec<String>,
    /// Present only once this alert has been folded into a merge group;
    /// `None` means it is still a standalone alert.
    pub merge_group_id: Option<Uuid>,
    /// Provenance fields carried through from the triggering event, used by
    /// the store schema and by merge to decide what a merged alert inherits
    /// from its first member.
    pub cluster: Option<String>,
    pub log_source: Option<String>,
    pub log_type: Option<String>,
    pub source_entity: Option<String>,
    pub source_service: Option<String>,
    /// True if any contributing event was a staged (test) detection.
    pub staged: bool,
    /// `rule.signal && rule.signal_threshold <= confidence`, set by the
    /// tuner. Distinct from whether the alert is stored/published at
    /// all: it only determines whether the alert is externally
    /// surfaced (dispatched) once it reaches the processor.
    pub signal: bool,
}

impl Alert {
    pub fn new(rule_id: impl Into<String>, rule_name: impl Into<String>, title: impl Into<String>, description: impl Into<String>, severity: Severity, confidence: Confidence, event: Event, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            title: title.into(),
            description: description.into(),
            severity,
            confidence,
            event,
            enrichments: serde_json::Map::new(),
            created_at,
            dispatched_at: None,
            outputs_sent: Vec::new(),
            merge_group_id: None,
            cluster: None,
            log_source: None,
            log_type: None,
            source_entity: None,
            source_service: None,
            staged: false,
            signal: false,
        }
    }

    /// Attaches the provenance fields read off the triggering event. Kept
    /// as a separate setter rather than extra `new` parameters since most
    /// callers (tests, merge output) don't need all five at once.
    pub fn with_provenance(mut self, cluster: Option<String>, log_source: Option<String>, log_type: Option<String>, source_entity: Option<String>, source_service: Option<String>, staged: bool) -> Self {
        self.cluster = cluster;
        self.log_source = log_source;
        self.log_type = log_type;
        self.source_entity = source_entity;
        self.source_service = source_service;
        self.staged = staged;
        self
    }

    pub fn risk_score(&self) -> RiskScore {
        risk_score(self.confidence, self.severity)
    }

    pub fn signal_type(&self) -> SignalType {
        crate::scoring::signal_type(self.confidence)
    }

    /// Whether `dispatcher` has already been recorded as a successful send.
    pub fn already_sent_to(&self, dispatcher: &str) -> bool {
        self.outputs_sent.iter().any(|name| name == dispatcher)
    }

    pub fn record_sent(&mut self, dispatcher: impl Into<String>) {
        let dispatcher = dispatcher.into();
        if !self.already_sent_to(&dispatcher) {
            self.outputs_sent.push(dispatcher);
        }
    }

    /// An alert is considered no longer in flight once its dispatch window
    /// (`proc_timeout` since `dispatched_at`) has elapsed; the at-most-once
    /// guard uses this to decide whether a stuck `dispatched_at` should be
    /// treated as abandoned and retried.
    pub fn dispatch_expired(&self, now: DateTime<Utc>, proc_timeout: chrono::Duration) -> bool {
        match self.dispatched_at {
            Some(dispatched_at) => now - dispatched_at > proc_timeout,
            None => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn sample_alert(confidence: Confidence) -> Alert {
        Alert::new(
            "r1",
            "suspicious_login",
            "Suspicious login",
            "flags suspicious logins",
            Severity::Medium,
            confidence,
            Event::new(),
            Utc::now(),
        )
    }
}
