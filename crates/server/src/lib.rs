//! Voice Gateway Server
//!
//! WebSocket transport and HTTP endpoints in front of the turn orchestrator.

pub mod http;
pub mod metrics;
pub mod state;
pub mod store;
pub mod websocket;

pub use http::create_router;
pub use metrics::{init_metrics, record_error, record_request};
pub use state::AppState;
pub use store::InMemoryMessageStore;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use voice_gateway_core::SessionError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Session(SessionError::AlreadyActive(_)) => StatusCode::CONFLICT,
            ServerError::Session(SessionError::CapacityReached(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Session(SessionError::Closed(_)) => StatusCode::GONE,
            ServerError::WebSocket(_) | ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
