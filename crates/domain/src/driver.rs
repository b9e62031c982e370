//! Drivers and their link to a user account.

use chrono::NaiveDate;
use common::{DriverId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::Order;

pub const MAX_NAME_LEN: u64 = 50;
pub const MIN_DRIVER_AGE: i32 = 18;
pub const MAX_DRIVER_AGE: i32 = 90;

/// A driver that can be assigned to orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all drivers.
    pub license_number: String,
    pub date_of_birth: NaiveDate,
    pub is_available: bool,
    /// The user account this driver belongs to. One driver per user.
    pub user_id: UserId,
}

/// A driver together with the orders assigned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverGraph {
    pub driver: Driver,
    pub orders: Vec<Order>,
}

impl DriverGraph {
    pub fn bare(driver: Driver) -> Self {
        Self {
            driver,
            orders: Vec::new(),
        }
    }

    /// Returns true if any assigned order still needs this driver.
    pub fn has_active_orders(&self) -> bool {
        self.orders.iter().any(|o| o.status.is_active())
    }
}

/// The part of a user account shown next to a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedUser {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
}
