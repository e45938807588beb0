//! Inbound asynchronous messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::correlation::CorrelationId;

/// Anything a backend delivers that can be matched to a parked request.
pub trait IncomingMessage {
    type Payload;

    fn correlation_id(&self) -> CorrelationId;

    /// What the parked request receives.
    fn into_payload(self) -> Self::Payload;
}

/// A JSON message: a `correlationId` plus whatever else the backend sends.
///
/// The whole message, id included, becomes the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub correlation_id: CorrelationId,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl IncomingMessage for Message {
    type Payload = Value;

    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    fn into_payload(self) -> Value {
        let mut body = self.fields;
        body.insert(
            "correlationId".to_string(),
            Value::String(self.correlation_id.to_string()),
        );
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_keeps_extra_fields() {
        let id = CorrelationId::new();
        let message: Message = serde_json::from_value(json!({
            "correlationId": id.to_string(),
            "data": "Data1",
            "count": 3,
        }))
        .unwrap();

        assert_eq!(message.correlation_id(), id);
        assert_eq!(message.fields.get("data"), Some(&json!("Data1")));
        assert_eq!(message.fields.len(), 2);
    }

    #[test]
    fn test_payload_is_whole_message() {
        let id = CorrelationId::new();
        let payload = Message::new(id).with_field("data", "Data1").into_payload();

        assert_eq!(
            payload,
            json!({ "correlationId": id.to_string(), "data": "Data1" })
        );
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let result = serde_json::from_value::<Message>(json!({ "data": "x" }));
        assert!(result.is_err());
    }
}
