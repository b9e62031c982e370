//! HTTP API server for the logistics back office.
//!
//! Serves order and driver management behind a bearer token guard,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use services::IdentityProvider;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, I>(state: Arc<AppState<S, I>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let protected = Router::new()
        .route(
            "/orders",
            get(routes::orders::list::<S, I>).post(routes::orders::create::<S, I>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S, I>)
                .put(routes::orders::update::<S, I>)
                .delete(routes::orders::delete::<S, I>),
        )
        .route(
            "/drivers",
            get(routes::drivers::list::<S, I>).post(routes::drivers::create::<S, I>),
        )
        .route(
            "/drivers/{id}",
            get(routes::drivers::get::<S, I>)
                .put(routes::drivers::update::<S, I>)
                .delete(routes::drivers::delete::<S, I>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::require_bearer::<S, I>,
        ));

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/register", post(routes::auth::register::<S, I>))
        .route("/auth/refresh", post(routes::auth::refresh::<S, I>))
        .merge(protected)
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
