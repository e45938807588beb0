//! Responses written for parked requests.
//!
//! - Delivered result → 200 with the payload as JSON
//! - Still in flight → 202 with `{"correlationId": ...}` and the id echoed
//!   in the correlation header

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationId;

/// Body of a 202 answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAccepted {
    pub correlation_id: CorrelationId,
}

/// 200 with the delivered payload.
pub fn delivered<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(payload)).into_response()
}

/// 202 telling the client the work is still in progress.
pub fn accepted(id: CorrelationId, header: &HeaderName) -> Response {
    let mut response = (StatusCode::ACCEPTED, Json(RequestAccepted { correlation_id: id })).into_response();
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(header.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    #[tokio::test]
    async fn test_accepted_response() {
        let id = CorrelationId::new();
        let header = HeaderName::from_static("correlationid");
        let response = accepted(id, &header);

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(&header).unwrap(), id.to_string().as_str());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: RequestAccepted = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.correlation_id, id);
    }

    #[tokio::test]
    async fn test_delivered_response() {
        let response = delivered(json!({ "data": "Data1" }));
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"], "Data1");
    }
}
