//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Forward client requests to the upstream backend
//! - Park accepted (202) upstream responses until their result arrives
//! - Accept pushed result messages
//! - Serve the admin API
//! - Release parked requests on graceful shutdown

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderName, Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::{AdminConfig, GatewayConfig};
use crate::http::ingest::ingest_message;
use crate::http::middleware::{park_accepted, ParkState};
use crate::observability::metrics;
use crate::rendezvous::RendezvousEngine;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: RendezvousEngine<Value>,
    pub client: Client<HttpConnector, Body>,
    pub upstream: Arc<str>,
    pub admin: AdminConfig,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    engine: RendezvousEngine<Value>,
    release: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let engine = RendezvousEngine::from_config(&config.rendezvous);
        Self::with_engine(config, engine)
    }

    /// Create a server around an existing engine, e.g. one already shared
    /// with an in-process delivery consumer.
    pub fn with_engine(config: GatewayConfig, engine: RendezvousEngine<Value>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let release = CancellationToken::new();

        let state = AppState {
            engine: engine.clone(),
            client,
            upstream: Arc::from(config.upstream.address.as_str()),
            admin: config.admin.clone(),
        };

        let header = HeaderName::try_from(config.rendezvous.correlation_header.as_str())
            .unwrap_or_else(|_| HeaderName::from_static("correlationid"));
        let park = ParkState::new(engine.clone(), header, release.clone());

        let router = Self::build_router(&config, state, park);
        Self {
            router,
            config,
            engine,
            release,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState, park: ParkState) -> Router {
        // The upstream timeout sits inside the parking layer, so it bounds
        // only the backend call and not the time spent parked.
        let proxy = Router::new()
            .fallback(forward_upstream)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.upstream.request_timeout_secs),
            ))
            .layer(middleware::from_fn_with_state(park, park_accepted))
            .with_state(state.clone());

        let mut router = Router::new();
        if config.ingest.enabled {
            router = router.route(
                &config.ingest.path,
                post(ingest_message).layer(RequestBodyLimitLayer::new(config.ingest.max_body_bytes)),
            );
        }
        if config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }

        router
            .with_state(state)
            .fallback_service(proxy)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until shutdown is signalled.
    ///
    /// On shutdown every parked request is released before connections drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            timeout_ms = self.config.rendezvous.timeout_ms,
            "HTTP server starting"
        );

        let release = self.release.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, releasing parked requests");
                release.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The engine behind this server.
    pub fn engine(&self) -> RendezvousEngine<Value> {
        self.engine.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Forward a request to the upstream backend unchanged.
async fn forward_upstream(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (mut parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    tracing::debug!(method = %method, path = %path, "Forwarding request");

    let authority = match Authority::from_str(&state.upstream) {
        Ok(authority) => authority,
        Err(e) => {
            tracing::error!(upstream = %state.upstream, error = %e, "Invalid upstream address");
            metrics::record_request(502);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream address").into_response();
        }
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(authority);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Could not rewrite request URI");
            metrics::record_request(400);
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    let upstream: Result<hyper::Response<Incoming>, _> =
        state.client.request(Request::from_parts(parts, body)).await;
    match upstream {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(
                method = %method,
                path = %path,
                status = %status,
                elapsed = ?start.elapsed(),
                "Upstream responded"
            );
            metrics::record_request(status.as_u16());

            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "Upstream error");
            metrics::record_request(502);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
