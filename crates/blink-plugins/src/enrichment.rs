use async_trait::async_trait;
use blink_core::{Alert, RegistryItem};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::EnrichmentError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSpec {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub rule: EnrichmentRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentRule {
    /// `GeoIpEnrichment`-style: looks `ip_field` up in a small static
    /// table and attaches `geo.country`. A real deployment would back
    /// this with a MaxMind-style database; the static table is enough to
    /// exercise the enrichment contract end-to-end.
    GeoIp { ip_field: String },
}

fn lookup_country(ip: &str) -> Option<&'static str> {
    match ip {
        "203.0.113.10" => Some("US"),
        "198.51.100.23" => Some("DE"),
        "192.0.2.5" => Some("JP"),
        _ => None,
    }
}

#[async_trait]
pub trait Enrichment: RegistryItem + Send + Sync {
    async fn apply(&self, alert: &mut Alert) -> Result<(), EnrichmentError>;
}

#[async_trait]
impl Enrichment for EnrichmentSpec {
    async fn apply(&self, alert: &mut Alert) -> Result<(), EnrichmentError> {
        match &self.rule {
            EnrichmentRule::GeoIp { ip_field } => {
                let ip = alert.event.first_match(ip_field, serde_json::Value::Null);
                let Some(ip) = ip.as_str() else {
                    return Ok(());
                };
                if let Some(country) = lookup_country(ip) {
                    alert
                        .enrichments
                        .insert("geo.country".to_string(), json!(country));
                }
                Ok(())
            }
        }
    }
}

impl RegistryItem for EnrichmentSpec {
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

#[cfg(test)]
mod tests {
    use super::*;
    use blink_core::{Confidence, Event, Severity};
    use chrono::Utc;
    use serde_json::json;

    fn spec() -> EnrichmentSpec {
        EnrichmentSpec {
            name: "geo_ip".into(),
            description: "attaches geo.country".into(),
            enabled: true,
            rule: EnrichmentRule::GeoIp {
                ip_field: "src_ip".into(),
            },
        }
    }

    fn alert_with_ip(ip: &str) -> Alert {
        let event = Event::from_map(json!({"src_ip": ip}).as_object().unwrap().clone());
        Alert::new("r1", "rule", "title", "desc", Severity::Low, Confidence::Low, event, Utc::now())
    }

    #[tokio::test]
    async fn known_ip_attaches_country() {
        let mut alert = alert_with_ip("203.0.113.10");
        spec().apply(&mut alert).await.unwrap();
        assert_eq!(alert.enrichments.get("geo.country"), Some(&json!("US")));
    }

    #[tokio::test]
    async fn unknown_ip_is_a_noop() {
        let mut alert = alert_with_ip("0.0.0.0");
        spec().apply(&mut alert).await.unwrap();
        assert!(alert.enrichments.get("geo.country").is_none());
    }
}
