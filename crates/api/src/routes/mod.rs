//! Route handlers and shared state.

pub mod auth;
pub mod drivers;
pub mod health;
pub mod metrics;
pub mod orders;

use services::{DriverService, IdentityProvider, OrderService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, I>
where
    S: Store + Clone,
    I: IdentityProvider,
{
    pub orders: OrderService<S>,
    pub drivers: DriverService<S, I>,
    pub identity: I,
}

impl<S, I> AppState<S, I>
where
    S: Store + Clone,
    I: IdentityProvider + Clone,
{
    pub fn new(store: S, identity: I) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            drivers: DriverService::new(store, identity.clone()),
            identity,
        }
    }
}

/// Parses a path segment into a typed id.
pub(crate) fn parse_id<T>(id: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
