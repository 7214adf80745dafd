//! HTTP Endpoints
//!
//! Health, readiness, metrics, a small session API and the WebSocket route.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::websocket::ws_handler;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(end_session))
        .route("/api/sessions/:id/text", post(inject_text))
        .route("/api/sessions/:id/transcript", get(get_transcript))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Empty origin list means any origin
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    tracing::info!("CORS configured with {} origins", parsed.len());
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions: Vec<_> = state
        .orchestrator
        .sessions()
        .into_iter()
        .map(|(id, session_state)| serde_json::json!({ "id": id, "state": session_state }))
        .collect();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session_state = state
        .orchestrator
        .state(&id)
        .ok_or_else(|| voice_gateway_core::SessionError::NotFound(id.clone()))?;
    Ok(Json(serde_json::json!({ "id": id, "state": session_state })))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.orchestrator.end(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

async fn inject_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> Result<StatusCode, ServerError> {
    if request.text.trim().is_empty() {
        return Err(ServerError::InvalidRequest("text must not be empty".to_string()));
    }
    state.orchestrator.inject_text(&id, request.text)?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let messages = state.store.transcript(&id);
    Json(serde_json::json!({ "id": id, "messages": messages }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    record_request("health");
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "sessions": state.orchestrator.session_count(),
    }))
}

/// Not ready once the session table is full
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let max = state.settings.server.max_sessions;
    let active = state.orchestrator.session_count();
    let ready = max == 0 || active < max;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "sessions": active,
            "max_sessions": max,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use voice_gateway_config::Settings;

    fn test_state() -> AppState {
        AppState::from_settings(Settings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/sessions/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_lifecycle_over_http() {
        let state = test_state();
        let _events = state.orchestrator.start("abc").unwrap();
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/sessions/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/sessions/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.orchestrator.session_count(), 0);
    }
}
