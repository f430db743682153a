use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit of work driven through a pipeline.
///
/// The payload is opaque to the engine; steps document which fields they read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            payload,
        }
    }

    /// Look up a payload field by JSON pointer (e.g. `/customer/email`)
    pub fn get(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.payload.pointer(pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_payload_only() {
        let event: Event = serde_json::from_value(json!({
            "payload": {"subject": "Invoice", "to_email": "support@example.com"}
        }))
        .unwrap();

        assert_eq!(event.get("/subject"), Some(&json!("Invoice")));
        assert!(event.get("/missing").is_none());
    }
}
