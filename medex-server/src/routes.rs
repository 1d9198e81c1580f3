use crate::handlers::{files, health, records};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the read-only catalog API. The viewer frontend runs on its own
/// origin, so CORS stays permissive like the legacy service.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::banner))
        .route("/api/health", get(health::health))
        .route("/api/search", get(records::search))
        .route("/api/records", get(records::list))
        .route(
            "/api/records/{id}",
            get(records::get).delete(records::delete),
        )
        .route("/api/file/{id}", get(files::get_file))
        .route("/api/thumbnail/{id}", get(files::get_thumbnail))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
