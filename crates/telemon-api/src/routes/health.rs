use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::middleware::auth::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/healthz", get(get_health))
}

async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
