//! Request DTOs for the HTTP facade
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Request body for `PUT /caches/:name/keys/:key`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in seconds; the cache defaults apply when absent
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"value": {"name": "ada"}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.value, json!({"name": "ada"}));
        assert!(req.ttl().is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_set_request_requires_value() {
        assert!(serde_json::from_str::<SetRequest>(r#"{"ttl": 5}"#).is_err());
    }
}
