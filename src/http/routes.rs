//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::ScoreEntry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - origins from CLIENT_ORIGIN, any origin when unset
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<header::HeaderValue>().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    // Plain request/response routes; the WebSocket lives as long as the client
    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/highscores", get(highscores_handler))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    Router::new()
        .merge(api_routes)
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connected: usize,
    players: usize,
    objects: usize,
    round: u64,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connected: state.world.connected(),
        players: state.world.player_count(),
        objects: state.world.object_count(),
        round: state.world.round(),
    })
}

// ============================================================================
// Leaderboard endpoint
// ============================================================================

#[derive(Serialize)]
struct HighscoresResponse {
    scores: Vec<ScoreEntry>,
}

async fn highscores_handler(
    State(state): State<AppState>,
) -> Result<Json<HighscoresResponse>, AppError> {
    let scores = state
        .world
        .leaderboard()
        .await
        .ok_or(AppError::WorldUnavailable)?;

    Ok(Json(HighscoresResponse { scores }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("World is not running")]
    WorldUnavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::WorldUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state(spawn_world: bool) -> AppState {
        let config = Config::from_lookup(|key| match key {
            "ROUND_SEED" => Some("17".to_string()),
            _ => None,
        })
        .unwrap();
        let (state, actor) = AppState::new(config);
        if spawn_world {
            tokio::spawn(actor.run());
        }
        state
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_world_gauges() {
        let (status, body) = get_json(build_router(test_state(true)), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connected"], 0);
        assert_eq!(body["players"], 0);
        assert_eq!(body["round"], 1);
        assert!(body["objects"].as_u64().unwrap() > 2);
    }

    #[tokio::test]
    async fn test_highscores_starts_empty() {
        let (status, body) = get_json(build_router(test_state(true)), "/highscores").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scores"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_highscores_without_world_is_unavailable() {
        let (status, body) = get_json(build_router(test_state(false)), "/highscores").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "World is not running");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = build_router(test_state(true))
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
