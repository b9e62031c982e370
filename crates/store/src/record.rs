use domain::{Cargo, Driver, Order, Vehicle};
use uuid::Uuid;

use crate::StoreError;

/// The four persisted entity kinds. One table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Order,
    Cargo,
    Driver,
    Vehicle,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "Order",
            EntityKind::Cargo => "Cargo",
            EntityKind::Driver => "Driver",
            EntityKind::Vehicle => "Vehicle",
        }
    }

    /// Name of the backing table.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Order => "orders",
            EntityKind::Cargo => "cargo",
            EntityKind::Driver => "drivers",
            EntityKind::Vehicle => "vehicles",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of any entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Order(Order),
    Cargo(Cargo),
    Driver(Driver),
    Vehicle(Vehicle),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Order(_) => EntityKind::Order,
            Record::Cargo(_) => EntityKind::Cargo,
            Record::Driver(_) => EntityKind::Driver,
            Record::Vehicle(_) => EntityKind::Vehicle,
        }
    }

    /// Primary key of the row.
    pub fn key(&self) -> Uuid {
        match self {
            Record::Order(o) => o.id.as_uuid(),
            Record::Cargo(c) => c.id.as_uuid(),
            Record::Driver(d) => d.id.as_uuid(),
            Record::Vehicle(v) => v.id.as_uuid(),
        }
    }

    pub(crate) fn mismatch(self, expected: EntityKind) -> StoreError {
        StoreError::InvalidData(format!("expected {expected} row, found {}", self.kind()))
    }
}

/// Relationships that can be followed from the referenced row back to the
/// rows pointing at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKey {
    /// `cargo.order_id`
    CargoOrder,
    /// `orders.driver_id`
    OrderDriver,
    /// `orders.vehicle_id`
    OrderVehicle,
    /// `drivers.user_id`
    DriverUser,
}

impl ForeignKey {
    /// Kind of the rows holding the reference.
    pub fn source(&self) -> EntityKind {
        match self {
            ForeignKey::CargoOrder => EntityKind::Cargo,
            ForeignKey::OrderDriver | ForeignKey::OrderVehicle => EntityKind::Order,
            ForeignKey::DriverUser => EntityKind::Driver,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            ForeignKey::CargoOrder => "order_id",
            ForeignKey::OrderDriver => "driver_id",
            ForeignKey::OrderVehicle => "vehicle_id",
            ForeignKey::DriverUser => "user_id",
        }
    }

    /// Returns the referenced id if `record` holds this reference.
    pub fn value_in(&self, record: &Record) -> Option<Uuid> {
        match (self, record) {
            (ForeignKey::CargoOrder, Record::Cargo(c)) => Some(c.order_id.as_uuid()),
            (ForeignKey::OrderDriver, Record::Order(o)) => o.driver_id.map(|id| id.as_uuid()),
            (ForeignKey::OrderVehicle, Record::Order(o)) => o.vehicle_id.map(|id| id.as_uuid()),
            (ForeignKey::DriverUser, Record::Driver(d)) => Some(d.user_id.as_uuid()),
            _ => None,
        }
    }
}

/// One buffered write.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Insert(Record),
    Update(Record),
    Delete { kind: EntityKind, id: Uuid },
}

impl Change {
    pub fn kind(&self) -> EntityKind {
        match self {
            Change::Insert(record) | Change::Update(record) => record.kind(),
            Change::Delete { kind, .. } => *kind,
        }
    }
}

