#![allow(non_snake_case)]

pub mod middleware;
pub mod routes;

use axum::Router;

use crate::middleware::auth::AppState;

pub fn api_router(state: AppState) -> Router {
    let apiRoutes = routes::api_routes(state.clone());

    Router::new().merge(apiRoutes).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use http::{header, Request, StatusCode};
    use serde_json::Value;
    use telemon_providers::{Collector, CollectorConfig, HostPaths};
    use tower::ServiceExt;

    fn state(root: &std::path::Path, token: Option<&str>) -> AppState {
        let config = CollectorConfig {
            paths: HostPaths::under(root),
            cpu_sample: Duration::from_millis(10),
            top_processes: 5,
            nvidia_smi: "/nonexistent/nvidia-smi".into(),
        };
        AppState {
            collector: Arc::new(Collector::new(config)),
            auth_token: token.map(str::to_string),
        }
    }

    async fn get(router: Router, uri: &str, auth: Option<(&str, &str)>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some((name, value)) = auth {
            builder = builder.header(name, value);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_metrics_endpoint_returns_full_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(state(dir.path(), None));

        let (status, body) = get(router, "/api/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cpu"]["sampling"], "fallback");
        assert!(body["memory"].is_null());
        assert_eq!(body["network_speeds"]["bytes_sent_per_sec"], 0.0);
        assert_eq!(body["battery"]["present"], false);
        assert!(body["gpu"].as_array().unwrap().is_empty());
        assert!(body.get("per_nic_speeds").is_some());
        assert!(body.get("message").is_some());
    }

    #[tokio::test]
    async fn test_section_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(state(dir.path(), None));

        let (status, body) = get(router.clone(), "/api/metrics/gpu", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(Vec::new()));

        let (status, body) = get(router, "/api/metrics/memory", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_auth_required_when_token_configured() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(state(dir.path(), Some("secret")));

        let (status, body) = get(router.clone(), "/api/metrics/gpu", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = get(
            router.clone(),
            "/api/metrics/gpu",
            Some((header::AUTHORIZATION.as_str(), "Bearer wrong")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(
            router.clone(),
            "/api/metrics/gpu",
            Some((header::AUTHORIZATION.as_str(), "Bearer secret")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(
            router,
            "/api/metrics/gpu",
            Some((header::COOKIE.as_str(), "theme=dark; session_token=secret")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(state(dir.path(), Some("secret")));

        let (status, body) = get(router, "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
