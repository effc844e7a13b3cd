//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Simple status response for liveness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Readiness response with database connectivity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReadyResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: u64,
}

/// Liveness probe: the process is up and serving.
pub async fn livez() -> Json<StatusResponse> {
    Json(StatusResponse { status: "alive".to_string() })
}

/// Readiness probe: the database is reachable.
pub async fn readyz(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, (StatusCode, Json<ReadyResponse>)> {
    let start = std::time::Instant::now();
    let connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    let response = ReadyResponse {
        status: if connected { "ready" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth { connected, latency_ms },
    };

    if connected {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_livez_reports_alive() {
        let response = livez().await;
        assert_eq!(response.0.status, "alive");
    }

    #[test]
    fn test_ready_response_serializes() {
        let response = ReadyResponse {
            status: "ready".into(),
            version: "0.1.0".into(),
            database: DatabaseHealth { connected: true, latency_ms: 3 },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["database"]["connected"], true);
    }
}
