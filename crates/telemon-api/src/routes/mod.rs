pub mod health;
pub mod metrics;

use axum::Router;

use crate::middleware::auth::AppState;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(metrics::routes(state))
        .merge(health::routes())
}
