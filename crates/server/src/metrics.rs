//! Prometheus metrics
//!
//! The pipeline records through the `metrics` facade; this module installs
//! the Prometheus recorder and renders it on `/metrics`.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::state::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_default_metrics();
    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

fn register_default_metrics() {
    gauge!("voice_gateway_sessions_active").set(0.0);
    counter!("voice_gateway_sessions_started_total").absolute(0);
    counter!("voice_gateway_sessions_ended_total").absolute(0);
    counter!("voice_gateway_finalizations_total").absolute(0);
    counter!("voice_gateway_interrupts_total").absolute(0);

    counter!("voice_gateway_requests_total", "endpoint" => "health").absolute(0);
    counter!("voice_gateway_requests_total", "endpoint" => "ws").absolute(0);

    histogram!("voice_gateway_stt_duration_seconds", "pass" => "final").record(0.0);
    histogram!("voice_gateway_llm_duration_seconds").record(0.0);
    histogram!("voice_gateway_tts_duration_seconds").record(0.0);

    for stage in ["stt", "reply", "tts", "knowledge", "persistence"] {
        counter!("voice_gateway_errors_total", "stage" => stage).absolute(0);
    }
}

pub fn record_request(endpoint: &'static str) {
    counter!("voice_gateway_requests_total", "endpoint" => endpoint).increment(1);
}

pub fn record_error(stage: &'static str) {
    counter!("voice_gateway_errors_total", "stage" => stage).increment(1);
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    gauge!("voice_gateway_sessions_active").set(state.orchestrator.session_count() as f64);

    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "metrics not initialized".to_string(),
        ),
    }
}
