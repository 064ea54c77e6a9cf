//! API Routes
//!
//! Configures the Axum router with all table, session and cache endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cancel_session, clear_cache, create_rows, delete_cache_prefix, delete_row, get_row,
    health_handler, list_rows, session_details, stats_handler, update_row, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /tables/:table` - Paginated, filtered list
/// - `POST /tables/:table` - Create one row (object) or many (array)
/// - `GET|PATCH|DELETE /tables/:table/:id` - Single row access
/// - `GET /sessions/:id/details` - Session with its attendance rows
/// - `POST /sessions/:id/cancel` - Cancel a session and drop its attendance
/// - `DELETE /cache`, `DELETE /cache/:prefix` - Manual invalidation
/// - `GET /stats`, `GET /health`
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tables/:table", get(list_rows).post(create_rows))
        .route(
            "/tables/:table/:id",
            get(get_row).patch(update_row).delete(delete_row),
        )
        .route("/sessions/:id/details", get(session_details))
        .route("/sessions/:id/cancel", post(cancel_session))
        .route("/cache", delete(clear_cache))
        .route("/cache/:prefix", delete(delete_cache_prefix))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
