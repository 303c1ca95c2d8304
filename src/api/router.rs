use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes — no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes — every request is scoped to the token's user
    let protected = Router::new()
        // Positions
        .route(
            "/api/positions",
            get(handlers::positions::list).post(handlers::positions::create),
        )
        .route(
            "/api/positions/:id",
            get(handlers::positions::detail)
                .put(handlers::positions::update)
                .delete(handlers::positions::remove),
        )
        // Operations
        .route("/api/positions/:id/operations", get(handlers::operations::list))
        .route("/api/positions/:id/increment", post(handlers::operations::increment))
        .route("/api/positions/:id/partial-exit", post(handlers::operations::partial_exit))
        .route(
            "/api/positions/:id/operations/:op_id",
            delete(handlers::operations::remove),
        )
        // Dashboard & analytics
        .route("/api/dashboard/summary", get(handlers::dashboard::summary))
        .route("/api/analytics/pnl-history", get(handlers::analytics::pnl_history))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
