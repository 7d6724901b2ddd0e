use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, routes};

pub mod auth;

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::suggestions::router())
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    let api_routes = routes::auth::public_router().merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
