//! Use cases of the logistics back office.
//!
//! [`OrderService`] and [`DriverService`] validate requests, enforce the
//! business rules and persist through a unit of work. Driver deletion also
//! removes the linked user account as a two-step saga:
//! 1. Delete the user account from the identity provider
//! 2. Delete the driver
//!
//! If step 2 fails, the removed account is restored.

pub mod driver_service;
pub mod error;
pub mod identity;
pub mod order_service;
pub mod requests;
pub mod seed;
pub mod views;

pub use driver_service::DriverService;
pub use error::{Result, ServiceError};
pub use identity::{
    Claims, IdentityError, IdentityProvider, InMemoryIdentityProvider, NewUser, TokenPair, User,
};
pub use order_service::OrderService;
pub use requests::{
    CargoRequest, CreateDriverRequest, CreateOrderRequest, UpdateDriverRequest,
    UpdateOrderRequest,
};
pub use seed::{SeedReport, ensure_admin, seed_sample_data};
pub use views::{CargoView, DriverSummary, DriverView, OrderView, VehicleSummary};
