//! Confidence, severity, risk and signal scoring.
//!
//! The risk matrix below is the authoritative table this repo ships with;
//! it is not derivable from `Confidence`/`Severity` alone, so it's kept as
//! an explicit lookup rather than a formula.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskScore {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Core,
    Leaf,
}

/// `risk_score = riskMatrix[confidence][severity]`.
pub fn risk_score(confidence: Confidence, severity: Severity) -> RiskScore {
    use Confidence::*;
    use RiskScore::*;
    use Severity::*;

    match (confidence, severity) {
        (VeryLow, Info) => Low,
        (VeryLow, Low) => Low,
        (VeryLow, Medium) => Low,
        (VeryLow, High) => Medium,
        (VeryLow, Critical) => Medium,

        (Low, Info) => Low,
        (Low, Low) => Low,
        (Low, Medium) => Medium,
        (Low, High) => Medium,
        (Low, Critical) => Medium,

        (Medium, Info) => Low,
        (Medium, Low) => Medium,
        (Medium, Medium) => Medium,
        (Medium, High) => High,
        (Medium, Critical) => High,

        (High, Info) => Low,
        (High, Low) => Medium,
        (High, Medium) => High,
        (High, High) => High,
        (High, Critical) => Critical,

        (VeryHigh, Info) => Medium,
        (VeryHigh, Low) => High,
        (VeryHigh, Medium) => High,
        (VeryHigh, High) => Critical,
        (VeryHigh, Critical) => Critical,
    }
}

/// `core` iff `confidence >= medium`.
pub fn signal_type(confidence: Confidence) -> SignalType {
    if confidence >= Confidence::Medium {
        SignalType::Core
    } else {
        SignalType::Leaf
    }
}
