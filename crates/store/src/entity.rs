//! Mapping between domain entities and stored records, plus eager loading.

use std::collections::HashMap;

use async_trait::async_trait;
use common::{CargoId, DriverId, OrderId, VehicleId};
use domain::{Cargo, Driver, DriverGraph, Order, OrderGraph, Vehicle};
use uuid::Uuid;

use crate::{EntityKind, ForeignKey, Record, Result, store::Store};

/// Which relations to load alongside an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderInclude {
    pub driver: bool,
    pub vehicle: bool,
    pub cargo: bool,
}

impl OrderInclude {
    pub const NONE: Self = Self {
        driver: false,
        vehicle: false,
        cargo: false,
    };

    pub const ALL: Self = Self {
        driver: true,
        vehicle: true,
        cargo: true,
    };
}

/// Which relations to load alongside a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverInclude {
    pub orders: bool,
}

impl DriverInclude {
    pub const NONE: Self = Self { orders: false };
    pub const ALL: Self = Self { orders: true };
}

/// Entities without loadable relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoInclude;

/// A persisted entity.
///
/// `Loaded` is the shape returned by reads: the entity itself, or a graph
/// with whatever relations `Include` asked for.
#[async_trait]
pub trait Entity: Clone + Send + Sync + Sized + 'static {
    type Id: Copy + Into<Uuid> + Send + Sync + std::fmt::Debug;
    type Include: Copy + Default + Send + Sync + std::fmt::Debug;
    type Loaded: Send;

    const KIND: EntityKind;

    fn key(&self) -> Uuid;

    fn into_record(self) -> Record;

    fn from_record(record: Record) -> Result<Self>;

    /// Loads the requested relations for a batch of entities, keeping order.
    async fn load_many<S>(
        items: Vec<Self>,
        store: &S,
        include: Self::Include,
    ) -> Result<Vec<Self::Loaded>>
    where
        S: Store + ?Sized;
}

fn from_records<E: Entity>(records: Vec<Record>) -> Result<Vec<E>> {
    records.into_iter().map(E::from_record).collect()
}

#[async_trait]
impl Entity for Order {
    type Id = OrderId;
    type Include = OrderInclude;
    type Loaded = OrderGraph;

    const KIND: EntityKind = EntityKind::Order;

    fn key(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn into_record(self) -> Record {
        Record::Order(self)
    }

    fn from_record(record: Record) -> Result<Self> {
        match record {
            Record::Order(order) => Ok(order),
            other => Err(other.mismatch(Self::KIND)),
        }
    }

    async fn load_many<S>(
        items: Vec<Self>,
        store: &S,
        include: OrderInclude,
    ) -> Result<Vec<OrderGraph>>
    where
        S: Store + ?Sized,
    {
        let mut drivers: HashMap<DriverId, Driver> = HashMap::new();
        if include.driver {
            let ids = distinct(items.iter().filter_map(|o| o.driver_id.map(Uuid::from)));
            if !ids.is_empty() {
                let rows = store.fetch_many(EntityKind::Driver, &ids).await?;
                for driver in from_records::<Driver>(rows)? {
                    drivers.insert(driver.id, driver);
                }
            }
        }

        let mut vehicles: HashMap<VehicleId, Vehicle> = HashMap::new();
        if include.vehicle {
            let ids = distinct(items.iter().filter_map(|o| o.vehicle_id.map(Uuid::from)));
            if !ids.is_empty() {
                let rows = store.fetch_many(EntityKind::Vehicle, &ids).await?;
                for vehicle in from_records::<Vehicle>(rows)? {
                    vehicles.insert(vehicle.id, vehicle);
                }
            }
        }

        let mut cargo: HashMap<OrderId, Vec<Cargo>> = HashMap::new();
        if include.cargo && !items.is_empty() {
            let ids: Vec<Uuid> = items.iter().map(|o| o.id.as_uuid()).collect();
            let rows = store.fetch_by_foreign_key(ForeignKey::CargoOrder, &ids).await?;
            for item in from_records::<Cargo>(rows)? {
                cargo.entry(item.order_id).or_default().push(item);
            }
        }

        Ok(items
            .into_iter()
            .map(|order| OrderGraph {
                driver: order.driver_id.and_then(|id| drivers.get(&id).cloned()),
                vehicle: order.vehicle_id.and_then(|id| vehicles.get(&id).cloned()),
                cargo: cargo.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

#[async_trait]
impl Entity for Driver {
    type Id = DriverId;
    type Include = DriverInclude;
    type Loaded = DriverGraph;

    const KIND: EntityKind = EntityKind::Driver;

    fn key(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn into_record(self) -> Record {
        Record::Driver(self)
    }

    fn from_record(record: Record) -> Result<Self> {
        match record {
            Record::Driver(driver) => Ok(driver),
            other => Err(other.mismatch(Self::KIND)),
        }
    }

    async fn load_many<S>(
        items: Vec<Self>,
        store: &S,
        include: DriverInclude,
    ) -> Result<Vec<DriverGraph>>
    where
        S: Store + ?Sized,
    {
        let mut orders: HashMap<DriverId, Vec<Order>> = HashMap::new();
        if include.orders && !items.is_empty() {
            let ids: Vec<Uuid> = items.iter().map(|d| d.id.as_uuid()).collect();
            let rows = store.fetch_by_foreign_key(ForeignKey::OrderDriver, &ids).await?;
            for order in from_records::<Order>(rows)? {
                if let Some(driver_id) = order.driver_id {
                    orders.entry(driver_id).or_default().push(order);
                }
            }
        }

        Ok(items
            .into_iter()
            .map(|driver| DriverGraph {
                orders: orders.remove(&driver.id).unwrap_or_default(),
                driver,
            })
            .collect())
    }
}

#[async_trait]
impl Entity for Vehicle {
    type Id = VehicleId;
    type Include = NoInclude;
    type Loaded = Vehicle;

    const KIND: EntityKind = EntityKind::Vehicle;

    fn key(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn into_record(self) -> Record {
        Record::Vehicle(self)
    }

    fn from_record(record: Record) -> Result<Self> {
        match record {
            Record::Vehicle(vehicle) => Ok(vehicle),
            other => Err(other.mismatch(Self::KIND)),
        }
    }

    async fn load_many<S>(items: Vec<Self>, _store: &S, _include: NoInclude) -> Result<Vec<Vehicle>>
    where
        S: Store + ?Sized,
    {
        Ok(items)
    }
}

#[async_trait]
impl Entity for Cargo {
    type Id = CargoId;
    type Include = NoInclude;
    type Loaded = Cargo;

    const KIND: EntityKind = EntityKind::Cargo;

    fn key(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn into_record(self) -> Record {
        Record::Cargo(self)
    }

    fn from_record(record: Record) -> Result<Self> {
        match record {
            Record::Cargo(cargo) => Ok(cargo),
            other => Err(other.mismatch(Self::KIND)),
        }
    }

    async fn load_many<S>(items: Vec<Self>, _store: &S, _include: NoInclude) -> Result<Vec<Cargo>>
    where
        S: Store + ?Sized,
    {
        Ok(items)
    }
}

fn distinct(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}
