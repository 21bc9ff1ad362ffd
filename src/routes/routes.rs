//! Defines routes for the bucket listing API.
//!
//! ## Structure
//! - **Health**
//!   - `GET /healthz`, `GET /readyz`
//!
//! - **Storage** (all under `/api/storage`)
//!   - `GET /buckets` — bucket names
//!   - `GET /buckets/{bucket}/objects` — flat key listing
//!   - `GET /buckets/{bucket}/objects/{*key}` — object content
//!   - `GET /buckets/{bucket}/browse?prefix=` — one folder level
//!
//! The wildcard `*key` allows nested keys like `logs/2024/a.txt`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        storage_handlers::{browse_bucket, get_object_content, list_buckets, list_object_keys},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

/// Build the router. Handlers share `StorageService` as state.
pub fn routes() -> Router<StorageService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/storage/buckets", get(list_buckets))
        .route("/api/storage/buckets/{bucket}/objects", get(list_object_keys))
        .route(
            "/api/storage/buckets/{bucket}/objects/{*key}",
            get(get_object_content),
        )
        .route("/api/storage/buckets/{bucket}/browse", get(browse_bucket))
}

/// Read-only CORS policy for the dashboard frontend.
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}
