//! Axum HTTP surface for the authorization and token endpoints.

pub mod context;
mod handler_oauth;
pub mod server;

pub use context::AppState;
pub use server::build_router;
