use crate::infrastructure::http::controllers;
use crate::infrastructure::http::middleware::AppState;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const API_PREFIX: &str = "/api/live-talk";

pub fn build_router(state: AppState) -> Router {
    let live_talk = Router::new()
        .merge(controllers::chat_flows::routes())
        .merge(controllers::widget::routes())
        .merge(controllers::conversations::routes())
        .merge(controllers::assignments::routes())
        .merge(controllers::health::routes());

    Router::new()
        .nest(API_PREFIX, live_talk)
        .layer(TraceLayer::new_for_http())
        // The widget is embedded on customer sites.
        .layer(CorsLayer::permissive())
        .with_state(state)
}
