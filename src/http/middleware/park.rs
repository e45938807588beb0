//! Parking middleware.
//!
//! Runs the inner handler first. Only a 202 carrying the correlation header
//! is held open; everything else passes through untouched.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::correlation::CorrelationId;
use crate::http::response::{accepted, delivered};
use crate::rendezvous::{ClientContext, Outcome, RendezvousEngine};

/// State shared by every parked request.
#[derive(Clone)]
pub struct ParkState {
    engine: RendezvousEngine<Value>,
    header: HeaderName,
    /// Parent of every request's cancellation signal; cancelled on shutdown.
    release: CancellationToken,
}

impl ParkState {
    pub fn new(engine: RendezvousEngine<Value>, header: HeaderName, release: CancellationToken) -> Self {
        Self {
            engine,
            header,
            release,
        }
    }
}

pub async fn park_accepted(
    State(state): State<ParkState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::ACCEPTED {
        return response;
    }

    let Some(raw) = response.headers().get(&state.header) else {
        return response;
    };
    let id = match CorrelationId::from_header_bytes(raw.as_bytes()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(header = %state.header, error = %e, "Accepted response has an unusable correlation id");
            return response;
        }
    };

    // A disconnect drops this future; the engine cleans up on drop.
    // Nothing has been written to the client before a middleware returns,
    // so the response-started flag is never set here.
    let client = ClientContext::new(state.release.child_token());
    match state.engine.await_result(id, &client).await {
        Outcome::Delivered(payload) => delivered(payload),
        Outcome::Accepted => accepted(id, &state.header),
        // Client gone or shutting down: nothing new is written.
        Outcome::Aborted => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, middleware, routing::get, Router};
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    const HEADER: &str = "correlationid";

    fn app(engine: RendezvousEngine<Value>, status: StatusCode, header: Option<String>) -> Router {
        let state = ParkState::new(engine, HeaderName::from_static(HEADER), CancellationToken::new());
        Router::new()
            .route(
                "/",
                get(move || {
                    let header = header.clone();
                    async move {
                        let mut response = Response::new(Body::from("upstream"));
                        *response.status_mut() = status;
                        if let Some(value) = header {
                            response.headers_mut().insert(HEADER, value.parse().unwrap());
                        }
                        response
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(state, park_accepted))
    }

    fn get_root() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ok_response_is_not_parked() {
        let engine = RendezvousEngine::new(Duration::from_secs(2));
        let id = CorrelationId::new();
        let response = app(engine.clone(), StatusCode::OK, Some(id.to_string()))
            .oneshot(get_root())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_without_header_is_not_parked() {
        let engine = RendezvousEngine::new(Duration::from_secs(2));
        let response = app(engine.clone(), StatusCode::ACCEPTED, None)
            .oneshot(get_root())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"upstream");
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_header_passes_through() {
        let engine = RendezvousEngine::new(Duration::from_secs(2));
        let response = app(engine.clone(), StatusCode::ACCEPTED, Some("not-an-id".into()))
            .oneshot(get_root())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_answers_accepted() {
        let engine = RendezvousEngine::new(Duration::from_secs(2));
        let id = CorrelationId::new();
        let start = tokio::time::Instant::now();

        let response = app(engine.clone(), StatusCode::ACCEPTED, Some(id.as_uuid().simple().to_string()))
            .oneshot(get_root())
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2100));
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(HEADER).unwrap(), id.to_string().as_str());
        assert_eq!(body_json(response).await, json!({ "correlationId": id.to_string() }));
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_answers_ok() {
        let engine = RendezvousEngine::new(Duration::from_secs(4));
        let id = CorrelationId::new();

        let request = tokio::spawn(
            app(engine.clone(), StatusCode::ACCEPTED, Some(id.to_string())).oneshot(get_root()),
        );
        while !engine.is_pending(&id) {
            tokio::task::yield_now().await;
        }
        engine.deliver_result(id, json!({ "correlationId": id.to_string(), "data": "Data1" }));

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], "Data1");
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_returns_upstream_response() {
        let engine = RendezvousEngine::new(Duration::from_secs(30));
        let release = CancellationToken::new();
        let id = CorrelationId::new();
        let state = ParkState::new(engine.clone(), HeaderName::from_static(HEADER), release.clone());
        let header_value = id.to_string();
        let app = Router::new()
            .route(
                "/",
                get(move || {
                    let header_value = header_value.clone();
                    async move { (StatusCode::ACCEPTED, [(HEADER, header_value)], "upstream") }
                }),
            )
            .layer(middleware::from_fn_with_state(state, park_accepted));

        let request = tokio::spawn(app.oneshot(get_root()));
        while !engine.is_pending(&id) {
            tokio::task::yield_now().await;
        }
        release.cancel();

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"upstream");
        assert_eq!(engine.pending(), 0);
    }
}
