use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub pending: usize,
    pub waiting: usize,
    pub delivered: usize,
    pub timeout_ms: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let (waiting, delivered) = state.engine.summary();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        pending: waiting + delivered,
        waiting,
        delivered,
        timeout_ms: state.engine.timeout().as_millis() as u64,
    })
}
