//! HTTP API for the property-management provisioning sagas.
//!
//! Exposes invitation, rental and organization endpoints over the saga
//! coordinator, with structured logging (tracing) and Prometheus metrics.
//! Authentication happens upstream; the caller's ids arrive as headers
//! (see [`context::CallerContext`]).

pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use resource_store::ResourceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::{AppState, create_default_state, create_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ResourceStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/invite/verify/{token}", get(routes::invitations::verify::<S>))
        .route("/invite/accept/{token}", post(routes::invitations::accept::<S>))
        .route("/invite/{role}", post(routes::invitations::invite::<S>))
        .route("/rentals", post(routes::rentals::create::<S>))
        .route("/organizations", post(routes::organizations::create::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
