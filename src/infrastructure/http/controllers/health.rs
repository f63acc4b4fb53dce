use axum::{routing::get, Router};

use crate::infrastructure::http::middleware::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> &'static str {
    "OK"
}
