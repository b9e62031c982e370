//! Domain layer for the logistics back office.
//!
//! This crate provides:
//! - Order, Cargo, Driver and Vehicle entities
//! - Order status lifecycle and vehicle capacity rules
//! - Field-level validation helpers
//! - The in-process filter/sort/paginate query engine used by list endpoints

pub mod driver;
pub mod error;
pub mod order;
pub mod query;
pub mod validation;
pub mod vehicle;

pub use driver::{Driver, DriverGraph, LinkedUser};
pub use error::DomainError;
pub use order::{Cargo, Order, OrderGraph, OrderStatus};
pub use query::{
    DriverFilter, DriverRecord, DriverSortField, OrderFilter, OrderSortField, PageRequest,
    QueryDescriptor, QuerySpec, SortKey, SortOrder,
};
pub use validation::ValidationErrors;
pub use vehicle::{Vehicle, VehicleType};
