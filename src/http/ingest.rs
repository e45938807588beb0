//! Webhook-style delivery endpoint.
//!
//! The backend (or a bus bridge) POSTs each result message as JSON. The
//! message must carry a `correlationId`; the whole message becomes the
//! payload of the parked response.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationId;
use crate::delivery::{dispatch, IncomingMessage, Message};
use crate::http::server::AppState;
use crate::rendezvous::DeliveryOutcome;

/// Acknowledgement returned to the pusher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub correlation_id: CorrelationId,
    pub outcome: DeliveryOutcome,
}

/// Error body for rejected messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    pub error: String,
}

pub async fn ingest_message(
    State(state): State<AppState>,
    payload: Result<Json<Message>, JsonRejection>,
) -> Response {
    let message = match payload {
        Ok(Json(message)) => message,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected inbound message");
            let body = IngestError {
                error: rejection.body_text(),
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let correlation_id = message.correlation_id();
    let outcome = dispatch(&state.engine, message);
    tracing::debug!(correlation_id = %correlation_id, outcome = outcome.as_str(), "Message ingested");

    // Redelivery is not an error for the pusher.
    (StatusCode::OK, Json(IngestAck { correlation_id, outcome })).into_response()
}
