//! Shipment orders and their cargo.

mod status;

pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use common::{CargoId, DriverId, OrderId, VehicleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::driver::Driver;
use crate::vehicle::Vehicle;

/// Longest accepted address.
pub const MAX_ADDRESS_LEN: u64 = 250;
/// Longest accepted order note.
pub const MAX_NOTES_LEN: u64 = 1000;
/// Longest accepted cargo name.
pub const MAX_CARGO_NAME_LEN: u64 = 100;
pub const MIN_CARGO_WEIGHT_KG: f64 = 0.01;
pub const MAX_CARGO_WEIGHT_KG: f64 = 100_000.0;
pub const MIN_CARGO_VOLUME_M3: f64 = 0.01;
pub const MAX_CARGO_VOLUME_M3: f64 = 10_000.0;
/// Prices are stored as `NUMERIC(18, 2)`: at most two decimal places and
/// sixteen integer digits.
pub const PRICE_SCALE: u32 = 2;
pub const PRICE_INTEGER_DIGITS: u32 = 16;

/// A shipment request.
///
/// Driver and vehicle are non-owning references. Cargo rows are owned by the
/// order and stored separately; see [`OrderGraph`] for the loaded aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub origin_address: String,
    pub destination_address: String,
    /// Set once on creation, never changed afterwards.
    pub creation_date: DateTime<Utc>,
    pub scheduled_pickup_date: DateTime<Utc>,
    pub actual_pickup_date: Option<DateTime<Utc>>,
    pub scheduled_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    pub price: Decimal,
    pub notes: Option<String>,
    pub driver_id: Option<DriverId>,
    pub vehicle_id: Option<VehicleId>,
}

/// A line item of goods belonging to exactly one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub id: CargoId,
    pub order_id: OrderId,
    pub name: String,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub quantity: i32,
}

/// An order together with whatever related records were eager-loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderGraph {
    pub order: Order,
    pub driver: Option<Driver>,
    pub vehicle: Option<Vehicle>,
    pub cargo: Vec<Cargo>,
}

impl OrderGraph {
    /// Wraps an order with nothing loaded.
    pub fn bare(order: Order) -> Self {
        Self {
            order,
            driver: None,
            vehicle: None,
            cargo: Vec::new(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.order.id
    }

    /// Finds a loaded cargo row by id.
    pub fn cargo_item(&self, id: CargoId) -> Option<&Cargo> {
        self.cargo.iter().find(|c| c.id == id)
    }
}
