//! HTTP API handlers.

use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SpinError;
use crate::metrics;
use crate::spinner::{SpinController, SpinStatus};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owner of the spin flag and its background tasks.
    pub spinner: SpinController,
    /// Prometheus handle, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state without a metrics endpoint.
    pub fn new(spinner: SpinController) -> Self {
        Self {
            spinner,
            prometheus: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Query parameters of `/spin`.
#[derive(Debug, Default, Deserialize)]
pub struct SpinParams {
    /// Seconds until the auto-stop timer fires.
    pub spin_time: Option<String>,
    /// Milliseconds until the auto-stop timer fires (legacy form).
    #[serde(rename = "spinTime")]
    pub spin_time_ms: Option<String>,
}

impl SpinParams {
    /// Resolve the requested duration. `spin_time` wins over `spinTime`.
    pub fn duration(&self, max: Duration) -> Result<Duration, SpinError> {
        let duration = match (&self.spin_time, &self.spin_time_ms) {
            (Some(secs), _) => parse_seconds(secs)?,
            (None, Some(millis)) => parse_millis(millis)?,
            (None, None) => {
                return Err(SpinError::InvalidParameter {
                    name: "spin_time",
                    reason: "missing".to_string(),
                })
            }
        };

        if duration > max {
            return Err(SpinError::InvalidParameter {
                name: "spin_time",
                reason: format!("must be at most {}s", max.as_secs_f64()),
            });
        }

        Ok(duration)
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, SpinError> {
    let invalid = |reason: &str| SpinError::InvalidParameter {
        name: "spin_time",
        reason: format!("{} ({:?})", reason, raw),
    };

    let secs: f64 = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if !secs.is_finite() {
        return Err(invalid("not a finite number"));
    }
    if secs < 0.0 {
        return Err(invalid("must not be negative"));
    }

    Duration::try_from_secs_f64(secs).map_err(|_| invalid("out of range"))
}

fn parse_millis(raw: &str) -> Result<Duration, SpinError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| SpinError::InvalidParameter {
            name: "spinTime",
            reason: format!("not a whole number of milliseconds ({:?})", raw),
        })
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Start spinning for the requested duration. Returns before any spinning happens.
pub async fn spin(
    State(state): State<AppState>,
    params: Result<Query<SpinParams>, QueryRejection>,
) -> Result<StatusCode, SpinError> {
    let result = params
        .map_err(|rejection| SpinError::InvalidParameter {
            name: "spin_time",
            reason: rejection.body_text(),
        })
        .and_then(|Query(params)| params.duration(state.spinner.max_spin_time()))
        .and_then(|spin_time| state.spinner.spin(spin_time));

    match result {
        Ok(id) => {
            debug!(spin = id, "Spin request accepted");
            Ok(StatusCode::OK)
        }
        Err(e) => {
            metrics::inc_spin_requests_rejected(match e {
                SpinError::InvalidParameter { .. } => "invalid_parameter",
                SpinError::Internal(_) => "internal",
            });
            Err(e)
        }
    }
}

/// Clear the spin flag.
pub async fn unspin(State(state): State<AppState>) -> StatusCode {
    state.spinner.unspin();
    StatusCode::OK
}

/// Current spin flag and background task counts.
pub async fn status(State(state): State<AppState>) -> Json<SpinStatus> {
    Json(state.spinner.status())
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus exposition - 503 when no recorder is installed.
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}
