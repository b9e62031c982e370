//! Shared types for the logistics back office.

mod page;
mod types;

pub use page::Page;
pub use types::{CargoId, DriverId, OrderId, UserId, VehicleId};
