//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection (Postgres or in-memory) and the catalog facade
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let api = routes::router().layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::log_requests)))
}
