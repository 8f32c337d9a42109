use axum::{
    extract::State,
    middleware,
    routing::get,
    Json, Router,
};

use crate::middleware::auth::{require_api_auth, AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/metrics", get(get_metrics))
        .route("/api/metrics/gpu", get(get_gpu_metrics))
        .route("/api/metrics/memory", get(get_memory_metrics))
        .route_layer(middleware::from_fn_with_state(
            state,
            require_api_auth,
        ))
}

async fn get_metrics(
    State(state): State<AppState>,
) -> Json<telemon_types::TelemetrySnapshot> {
    let snapshot = state.collector.collect().await;
    Json(snapshot)
}

async fn get_gpu_metrics(
    State(state): State<AppState>,
) -> Json<Vec<telemon_types::GpuInfo>> {
    let gpus = telemon_providers::gpu::collect(&state.collector.config().nvidia_smi).await;
    Json(gpus)
}

async fn get_memory_metrics(
    State(state): State<AppState>,
) -> Json<Option<telemon_types::MemoryMetrics>> {
    let memory = telemon_providers::memory::collect(&state.collector.config().paths).await;
    Json(memory)
}
