//! Response shapes returned by the services.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CargoId, DriverId, OrderId, UserId, VehicleId};
use domain::{Cargo, Driver, DriverRecord, OrderGraph, OrderStatus, Vehicle};
use rust_decimal::Decimal;
use serde::Serialize;

/// An order with its driver, vehicle and cargo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub origin_address: String,
    pub destination_address: String,
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
    pub driver: Option<DriverSummary>,
    pub vehicle: Option<VehicleSummary>,
    pub cargo: Vec<CargoView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    pub license_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    pub license_plate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CargoView {
    pub id: CargoId,
    pub name: String,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub quantity: i32,
}

impl From<OrderGraph> for OrderView {
    fn from(graph: OrderGraph) -> Self {
        let OrderGraph {
            order,
            driver,
            vehicle,
            cargo,
        } = graph;

        Self {
            id: order.id,
            origin_address: order.origin_address,
            destination_address: order.destination_address,
            creation_date: order.creation_date,
            scheduled_pickup_date: order.scheduled_pickup_date,
            actual_pickup_date: order.actual_pickup_date,
            scheduled_delivery_date: order.scheduled_delivery_date,
            actual_delivery_date: order.actual_delivery_date,
            status: order.status,
            total_weight_kg: order.total_weight_kg,
            total_volume_m3: order.total_volume_m3,
            price: order.price,
            notes: order.notes,
            driver: driver.map(DriverSummary::from),
            vehicle: vehicle.map(VehicleSummary::from),
            cargo: cargo.into_iter().map(CargoView::from).collect(),
        }
    }
}

impl From<Driver> for DriverSummary {
    fn from(driver: Driver) -> Self {
        Self {
            id: driver.id,
            first_name: driver.first_name,
            last_name: driver.last_name,
            license_number: driver.license_number,
        }
    }
}

impl From<Vehicle> for VehicleSummary {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            make: vehicle.make,
            model: vehicle.model,
            license_plate: vehicle.license_plate,
        }
    }
}

impl From<Cargo> for CargoView {
    fn from(cargo: Cargo) -> Self {
        Self {
            id: cargo.id,
            name: cargo.name,
            weight_kg: cargo.weight_kg,
            volume_m3: cargo.volume_m3,
            quantity: cargo.quantity,
        }
    }
}

/// A driver with the name and email of the linked user account.
///
/// `user_name` and `email` are empty when the account no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverView {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    pub license_number: String,
    pub date_of_birth: NaiveDate,
    pub is_available: bool,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<DriverRecord> for DriverView {
    fn from(record: DriverRecord) -> Self {
        let DriverRecord { driver, user } = record;
        let (user_name, email) = user
            .map(|u| (u.user_name, u.email))
            .unwrap_or_default();

        Self {
            id: driver.id,
            first_name: driver.first_name,
            last_name: driver.last_name,
            license_number: driver.license_number,
            date_of_birth: driver.date_of_birth,
            is_available: driver.is_available,
            user_id: driver.user_id,
            user_name,
            email,
        }
    }
}
