//! Main router configuration assembling the OAuth endpoints.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::{
    context::AppState,
    handler_oauth::{handle_oauth_authorize, handle_oauth_token},
};

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    let oauth_routes = Router::new()
        .route("/authorize", get(handle_oauth_authorize))
        .route("/token", post(handle_oauth_token));

    Router::new()
        .nest("/oauth", oauth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
