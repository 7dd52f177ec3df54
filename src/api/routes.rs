//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ws", get(ws_handler))
        // Treasury
        .route("/api/treasury", get(handlers::get_treasury))
        .route("/api/treasury/deposit", post(handlers::deposit))
        .route("/api/treasury/topup", post(handlers::top_up))
        .route("/api/treasury/sweep", post(handlers::sweep))
        // Roles
        .route("/api/minters", post(handlers::add_minter))
        .route("/api/minters/{address}", delete(handlers::remove_minter))
        // Users
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/users/{username}", get(handlers::get_user))
        .route("/api/users/{username}/mint", post(handlers::mint_to_user))
        .route(
            "/api/users/{username}/checkin",
            post(handlers::check_in_user),
        )
        .route("/api/balances/{address}", get(handlers::get_balance))
        .with_state(state)
        .layer(cors)
}
