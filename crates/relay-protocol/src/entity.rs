//! Entity-graph wire format (§6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub source: String,
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub metadata: Value,
}

/// `source_id` is the namespaced relationship endpoint
/// (`"<source>:<id>"`, e.g. `"telegram:12345"`), not the raw remote id —
/// it disambiguates across skills sharing one entity graph (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub source: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Namespace a raw remote id for use as a `Relationship` endpoint.
pub fn namespaced_id(source: &str, raw_id: &str) -> String {
    format!("{source}:{raw_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_id_prefixes_source() {
        assert_eq!(namespaced_id("telegram", "12345"), "telegram:12345");
    }
}
