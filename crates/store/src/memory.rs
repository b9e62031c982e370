use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{Cargo, Driver, Order, Vehicle};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Change, EntityKind, ForeignKey, Record, Result, StoreError, store::Store};

/// In-memory store implementation for tests and database-less runs.
///
/// Enforces the same keys, unique constraints, cascades and set-null rules
/// as the PostgreSQL schema.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_on_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows of a kind.
    pub async fn row_count(&self, kind: EntityKind) -> usize {
        let tables = self.tables.read().await;
        match kind {
            EntityKind::Order => tables.orders.len(),
            EntityKind::Cargo => tables.cargo.len(),
            EntityKind::Driver => tables.drivers.len(),
            EntityKind::Vehicle => tables.vehicles.len(),
        }
    }

    /// Configures the store to reject every commit.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Removes every row.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: BTreeMap<Uuid, Order>,
    cargo: BTreeMap<Uuid, Cargo>,
    drivers: BTreeMap<Uuid, Driver>,
    vehicles: BTreeMap<Uuid, Vehicle>,
}

impl Tables {
    fn get(&self, kind: EntityKind, id: Uuid) -> Option<Record> {
        match kind {
            EntityKind::Order => self.orders.get(&id).cloned().map(Record::Order),
            EntityKind::Cargo => self.cargo.get(&id).cloned().map(Record::Cargo),
            EntityKind::Driver => self.drivers.get(&id).cloned().map(Record::Driver),
            EntityKind::Vehicle => self.vehicles.get(&id).cloned().map(Record::Vehicle),
        }
    }

    fn rows(&self, kind: EntityKind) -> Vec<Record> {
        match kind {
            EntityKind::Order => self.orders.values().cloned().map(Record::Order).collect(),
            EntityKind::Cargo => self.cargo.values().cloned().map(Record::Cargo).collect(),
            EntityKind::Driver => self.drivers.values().cloned().map(Record::Driver).collect(),
            EntityKind::Vehicle => self.vehicles.values().cloned().map(Record::Vehicle).collect(),
        }
    }

    fn apply(&mut self, change: Change) -> Result<()> {
        match change {
            Change::Insert(record) => self.insert(record),
            Change::Update(record) => self.update(record),
            Change::Delete { kind, id } => self.delete(kind, id),
        }
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        let kind = record.kind();
        let key = record.key();
        let occupied = match record {
            Record::Order(o) => self.orders.insert(key, o).is_some(),
            Record::Cargo(c) => self.cargo.insert(key, c).is_some(),
            Record::Driver(d) => self.drivers.insert(key, d).is_some(),
            Record::Vehicle(v) => self.vehicles.insert(key, v).is_some(),
        };
        if occupied {
            return Err(StoreError::UniqueViolation {
                constraint: format!("{}_pkey", kind.table()),
            });
        }
        Ok(())
    }

    fn update(&mut self, record: Record) -> Result<()> {
        let kind = record.kind();
        let key = record.key();
        let slot = match record {
            Record::Order(o) => self.orders.get_mut(&key).map(|row| *row = o),
            Record::Cargo(c) => self.cargo.get_mut(&key).map(|row| *row = c),
            Record::Driver(d) => self.drivers.get_mut(&key).map(|row| *row = d),
            Record::Vehicle(v) => self.vehicles.get_mut(&key).map(|row| *row = v),
        };
        slot.ok_or(StoreError::RecordNotFound { kind, id: key })
    }

    fn delete(&mut self, kind: EntityKind, id: Uuid) -> Result<()> {
        let removed = match kind {
            EntityKind::Order => {
                let removed = self.orders.remove(&id).is_some();
                self.cargo.retain(|_, c| c.order_id.as_uuid() != id);
                removed
            }
            EntityKind::Cargo => self.cargo.remove(&id).is_some(),
            EntityKind::Driver => {
                let removed = self.drivers.remove(&id).is_some();
                for order in self.orders.values_mut() {
                    if order.driver_id.is_some_and(|d| d.as_uuid() == id) {
                        order.driver_id = None;
                    }
                }
                removed
            }
            EntityKind::Vehicle => {
                let removed = self.vehicles.remove(&id).is_some();
                for order in self.orders.values_mut() {
                    if order.vehicle_id.is_some_and(|v| v.as_uuid() == id) {
                        order.vehicle_id = None;
                    }
                }
                removed
            }
        };
        if !removed {
            return Err(StoreError::RecordNotFound { kind, id });
        }
        Ok(())
    }

    /// Checks references and unique columns once a batch has been applied.
    fn check_constraints(&self) -> Result<()> {
        if self
            .cargo
            .values()
            .any(|c| !self.orders.contains_key(&c.order_id.as_uuid()))
        {
            return Err(foreign_key("cargo_order_id_fkey"));
        }
        for order in self.orders.values() {
            if let Some(driver_id) = order.driver_id
                && !self.drivers.contains_key(&driver_id.as_uuid())
            {
                return Err(foreign_key("orders_driver_id_fkey"));
            }
            if let Some(vehicle_id) = order.vehicle_id
                && !self.vehicles.contains_key(&vehicle_id.as_uuid())
            {
                return Err(foreign_key("orders_vehicle_id_fkey"));
            }
        }

        unique(
            self.drivers.values().map(|d| d.license_number.as_str()),
            "drivers_license_number_key",
        )?;
        unique(
            self.drivers.values().map(|d| d.user_id),
            "drivers_user_id_key",
        )?;
        unique(
            self.vehicles.values().map(|v| v.license_plate.as_str()),
            "vehicles_license_plate_key",
        )?;
        Ok(())
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

fn unique<T: Eq + std::hash::Hash>(values: impl Iterator<Item = T>, constraint: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(StoreError::UniqueViolation {
                constraint: constraint.to_string(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn fetch(&self, kind: EntityKind, id: Uuid) -> Result<Option<Record>> {
        Ok(self.tables.read().await.get(kind, id))
    }

    async fn fetch_many(&self, kind: EntityKind, ids: &[Uuid]) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        Ok(ids.into_iter().filter_map(|id| tables.get(kind, id)).collect())
    }

    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(self.tables.read().await.rows(kind))
    }

    async fn fetch_by_foreign_key(
        &self,
        foreign_key: ForeignKey,
        ids: &[Uuid],
    ) -> Result<Vec<Record>> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let tables = self.tables.read().await;
        Ok(tables
            .rows(foreign_key.source())
            .into_iter()
            .filter(|record| {
                foreign_key
                    .value_in(record)
                    .is_some_and(|id| wanted.contains(&id))
            })
            .collect())
    }

    async fn commit(&self, changes: Vec<Change>) -> Result<()> {
        if self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData(
                "Simulated commit failure".to_string(),
            ));
        }
        let mut tables = self.tables.write().await;

        // Work on a copy so a failing batch leaves nothing behind
        let mut staged = tables.clone();
        for change in changes {
            staged.apply(change)?;
        }
        staged.check_constraints()?;

        *tables = staged;
        Ok(())
    }
}
