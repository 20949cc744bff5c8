//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, prometheus_metrics, spin, status, unspin, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Spin endpoints
        .route("/spin", get(spin))
        .route("/unspin", get(unspin))
        .route("/status", get(status))
        // Health and metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spinner::{SpinController, SpinPolicy};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(SpinController::with_settings(
            SpinPolicy::Accumulate,
            Duration::from_micros(100),
            Duration::from_secs(60),
        ))
    }

    async fn send_get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(test_state());

        let response = send_get(app, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn spin_sets_flag_and_returns_empty_ok() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = send_get(app, "/spin?spin_time=5").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.is_empty());
        assert!(state.spinner.is_spinning());

        state.spinner.shutdown();
    }

    #[tokio::test]
    async fn spin_accepts_legacy_millisecond_parameter() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = send_get(app, "/spin?spinTime=5000").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.spinner.is_spinning());

        state.spinner.shutdown();
    }

    #[tokio::test]
    async fn spin_without_spin_time_is_bad_request() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = send_get(app, "/spin").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("spin_time"));
        assert!(!state.spinner.is_spinning());
    }

    #[tokio::test]
    async fn spin_with_non_numeric_spin_time_is_bad_request() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = send_get(app, "/spin?spin_time=soon").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.spinner.status().spins_started, 0);
    }

    #[tokio::test]
    async fn spin_after_shutdown_is_server_error() {
        let state = test_state();
        state.spinner.shutdown();
        let app = create_router(state.clone());

        let response = send_get(app, "/spin?spin_time=1").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unspin_clears_flag_and_is_idempotent() {
        let state = test_state();

        let response = send_get(create_router(state.clone()), "/spin?spin_time=5").await;
        assert_eq!(response.status(), StatusCode::OK);

        for _ in 0..2 {
            let response = send_get(create_router(state.clone()), "/unspin").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(!state.spinner.is_spinning());
        }

        state.spinner.shutdown();
    }

    #[tokio::test]
    async fn status_reports_spin_state() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = send_get(app, "/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["spinning"], false);
        assert_eq!(body["spins_started"], 0);
        assert_eq!(body["policy"], "accumulate");
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_503_without_recorder() {
        let app = create_router(test_state());

        let response = send_get(app, "/metrics").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
