use async_trait::async_trait;
use common::{CargoId, DriverId, OrderId, UserId, VehicleId};
use domain::{Cargo, Driver, Order, OrderStatus, Vehicle, VehicleType};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{Change, EntityKind, ForeignKey, Record, Result, StoreError, store::Store};

const ORDER_COLUMNS: &str = "id, origin_address, destination_address, creation_date, \
    scheduled_pickup_date, actual_pickup_date, scheduled_delivery_date, actual_delivery_date, \
    status, total_weight_kg, total_volume_m3, price, notes, driver_id, vehicle_id";

const CARGO_COLUMNS: &str = "id, order_id, name, weight_kg, volume_m3, quantity";

const DRIVER_COLUMNS: &str =
    "id, first_name, last_name, license_number, date_of_birth, is_available, user_id";

const VEHICLE_COLUMNS: &str = "id, make, model, license_plate, year, vehicle_type, \
    max_weight_capacity_kg, max_volume_capacity_m3, is_available";

/// PostgreSQL-backed store implementation.
///
/// Each [`Store::commit`] runs in one transaction. Cascades and set-null
/// rules are enforced by the schema's foreign keys.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn select(kind: EntityKind) -> String {
        let columns = match kind {
            EntityKind::Order => ORDER_COLUMNS,
            EntityKind::Cargo => CARGO_COLUMNS,
            EntityKind::Driver => DRIVER_COLUMNS,
            EntityKind::Vehicle => VEHICLE_COLUMNS,
        };
        format!("SELECT {columns} FROM {}", kind.table())
    }

    fn row_to_record(kind: EntityKind, row: PgRow) -> Result<Record> {
        Ok(match kind {
            EntityKind::Order => Record::Order(Self::row_to_order(row)?),
            EntityKind::Cargo => Record::Cargo(Self::row_to_cargo(row)?),
            EntityKind::Driver => Record::Driver(Self::row_to_driver(row)?),
            EntityKind::Vehicle => Record::Vehicle(Self::row_to_vehicle(row)?),
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            origin_address: row.try_get("origin_address")?,
            destination_address: row.try_get("destination_address")?,
            creation_date: row.try_get("creation_date")?,
            scheduled_pickup_date: row.try_get("scheduled_pickup_date")?,
            actual_pickup_date: row.try_get("actual_pickup_date")?,
            scheduled_delivery_date: row.try_get("scheduled_delivery_date")?,
            actual_delivery_date: row.try_get("actual_delivery_date")?,
            status: OrderStatus::try_from(row.try_get::<i16, _>("status")?)?,
            total_weight_kg: row.try_get("total_weight_kg")?,
            total_volume_m3: row.try_get("total_volume_m3")?,
            price: row.try_get("price")?,
            notes: row.try_get("notes")?,
            driver_id: row
                .try_get::<Option<Uuid>, _>("driver_id")?
                .map(DriverId::from_uuid),
            vehicle_id: row
                .try_get::<Option<Uuid>, _>("vehicle_id")?
                .map(VehicleId::from_uuid),
        })
    }

    fn row_to_cargo(row: PgRow) -> Result<Cargo> {
        Ok(Cargo {
            id: CargoId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            name: row.try_get("name")?,
            weight_kg: row.try_get("weight_kg")?,
            volume_m3: row.try_get("volume_m3")?,
            quantity: row.try_get("quantity")?,
        })
    }

    fn row_to_driver(row: PgRow) -> Result<Driver> {
        Ok(Driver {
            id: DriverId::from_uuid(row.try_get::<Uuid, _>("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            license_number: row.try_get("license_number")?,
            date_of_birth: row.try_get("date_of_birth")?,
            is_available: row.try_get("is_available")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        })
    }

    fn row_to_vehicle(row: PgRow) -> Result<Vehicle> {
        Ok(Vehicle {
            id: VehicleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            make: row.try_get("make")?,
            model: row.try_get("model")?,
            license_plate: row.try_get("license_plate")?,
            year: row.try_get("year")?,
            vehicle_type: VehicleType::try_from(row.try_get::<i16, _>("vehicle_type")?)?,
            max_weight_capacity_kg: row.try_get("max_weight_capacity_kg")?,
            max_volume_capacity_m3: row.try_get("max_volume_capacity_m3")?,
            is_available: row.try_get("is_available")?,
        })
    }

    async fn insert(tx: &mut Transaction<'_, Postgres>, record: Record) -> Result<u64> {
        let result = match record {
            Record::Order(o) => {
                sqlx::query(
                    r#"
                    INSERT INTO orders (id, origin_address, destination_address, creation_date,
                        scheduled_pickup_date, actual_pickup_date, scheduled_delivery_date,
                        actual_delivery_date, status, total_weight_kg, total_volume_m3, price,
                        notes, driver_id, vehicle_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                    "#,
                )
                .bind(o.id.as_uuid())
                .bind(&o.origin_address)
                .bind(&o.destination_address)
                .bind(o.creation_date)
                .bind(o.scheduled_pickup_date)
                .bind(o.actual_pickup_date)
                .bind(o.scheduled_delivery_date)
                .bind(o.actual_delivery_date)
                .bind(o.status.as_i16())
                .bind(o.total_weight_kg)
                .bind(o.total_volume_m3)
                .bind(o.price)
                .bind(&o.notes)
                .bind(o.driver_id.map(Uuid::from))
                .bind(o.vehicle_id.map(Uuid::from))
                .execute(&mut **tx)
                .await
            }
            Record::Cargo(c) => {
                sqlx::query(
                    r#"
                    INSERT INTO cargo (id, order_id, name, weight_kg, volume_m3, quantity)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(c.id.as_uuid())
                .bind(c.order_id.as_uuid())
                .bind(&c.name)
                .bind(c.weight_kg)
                .bind(c.volume_m3)
                .bind(c.quantity)
                .execute(&mut **tx)
                .await
            }
            Record::Driver(d) => {
                sqlx::query(
                    r#"
                    INSERT INTO drivers (id, first_name, last_name, license_number,
                        date_of_birth, is_available, user_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(d.id.as_uuid())
                .bind(&d.first_name)
                .bind(&d.last_name)
                .bind(&d.license_number)
                .bind(d.date_of_birth)
                .bind(d.is_available)
                .bind(d.user_id.as_uuid())
                .execute(&mut **tx)
                .await
            }
            Record::Vehicle(v) => {
                sqlx::query(
                    r#"
                    INSERT INTO vehicles (id, make, model, license_plate, year, vehicle_type,
                        max_weight_capacity_kg, max_volume_capacity_m3, is_available)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(v.id.as_uuid())
                .bind(&v.make)
                .bind(&v.model)
                .bind(&v.license_plate)
                .bind(v.year)
                .bind(v.vehicle_type.as_i16())
                .bind(v.max_weight_capacity_kg)
                .bind(v.max_volume_capacity_m3)
                .bind(v.is_available)
                .execute(&mut **tx)
                .await
            }
        };
        Ok(result.map_err(map_constraint_error)?.rows_affected())
    }

    async fn update(tx: &mut Transaction<'_, Postgres>, record: Record) -> Result<u64> {
        let result = match record {
            Record::Order(o) => {
                sqlx::query(
                    r#"
                    UPDATE orders SET origin_address = $2, destination_address = $3,
                        creation_date = $4, scheduled_pickup_date = $5, actual_pickup_date = $6,
                        scheduled_delivery_date = $7, actual_delivery_date = $8, status = $9,
                        total_weight_kg = $10, total_volume_m3 = $11, price = $12, notes = $13,
                        driver_id = $14, vehicle_id = $15
                    WHERE id = $1
                    "#,
                )
                .bind(o.id.as_uuid())
                .bind(&o.origin_address)
                .bind(&o.destination_address)
                .bind(o.creation_date)
                .bind(o.scheduled_pickup_date)
                .bind(o.actual_pickup_date)
                .bind(o.scheduled_delivery_date)
                .bind(o.actual_delivery_date)
                .bind(o.status.as_i16())
                .bind(o.total_weight_kg)
                .bind(o.total_volume_m3)
                .bind(o.price)
                .bind(&o.notes)
                .bind(o.driver_id.map(Uuid::from))
                .bind(o.vehicle_id.map(Uuid::from))
                .execute(&mut **tx)
                .await
            }
            Record::Cargo(c) => {
                sqlx::query(
                    r#"
                    UPDATE cargo SET order_id = $2, name = $3, weight_kg = $4, volume_m3 = $5,
                        quantity = $6
                    WHERE id = $1
                    "#,
                )
                .bind(c.id.as_uuid())
                .bind(c.order_id.as_uuid())
                .bind(&c.name)
                .bind(c.weight_kg)
                .bind(c.volume_m3)
                .bind(c.quantity)
                .execute(&mut **tx)
                .await
            }
            Record::Driver(d) => {
                sqlx::query(
                    r#"
                    UPDATE drivers SET first_name = $2, last_name = $3, license_number = $4,
                        date_of_birth = $5, is_available = $6, user_id = $7
                    WHERE id = $1
                    "#,
                )
                .bind(d.id.as_uuid())
                .bind(&d.first_name)
                .bind(&d.last_name)
                .bind(&d.license_number)
                .bind(d.date_of_birth)
                .bind(d.is_available)
                .bind(d.user_id.as_uuid())
                .execute(&mut **tx)
                .await
            }
            Record::Vehicle(v) => {
                sqlx::query(
                    r#"
                    UPDATE vehicles SET make = $2, model = $3, license_plate = $4, year = $5,
                        vehicle_type = $6, max_weight_capacity_kg = $7,
                        max_volume_capacity_m3 = $8, is_available = $9
                    WHERE id = $1
                    "#,
                )
                .bind(v.id.as_uuid())
                .bind(&v.make)
                .bind(&v.model)
                .bind(&v.license_plate)
                .bind(v.year)
                .bind(v.vehicle_type.as_i16())
                .bind(v.max_weight_capacity_kg)
                .bind(v.max_volume_capacity_m3)
                .bind(v.is_available)
                .execute(&mut **tx)
                .await
            }
        };
        Ok(result.map_err(map_constraint_error)?.rows_affected())
    }
}

/// Maps constraint violations to their store errors, leaving others as
/// database errors.
fn map_constraint_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation { constraint };
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::ForeignKeyViolation { constraint };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PostgresStore {
    async fn fetch(&self, kind: EntityKind, id: Uuid) -> Result<Option<Record>> {
        let sql = format!("{} WHERE id = $1", Self::select(kind));
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::row_to_record(kind, row)).transpose()
    }

    async fn fetch_many(&self, kind: EntityKind, ids: &[Uuid]) -> Result<Vec<Record>> {
        let sql = format!("{} WHERE id = ANY($1) ORDER BY id ASC", Self::select(kind));
        let rows = sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Self::row_to_record(kind, row))
            .collect()
    }

    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let sql = format!("{} ORDER BY id ASC", Self::select(kind));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| Self::row_to_record(kind, row))
            .collect()
    }

    async fn fetch_by_foreign_key(
        &self,
        foreign_key: ForeignKey,
        ids: &[Uuid],
    ) -> Result<Vec<Record>> {
        let kind = foreign_key.source();
        let sql = format!(
            "{} WHERE {} = ANY($1) ORDER BY id ASC",
            Self::select(kind),
            foreign_key.column()
        );
        let rows = sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Self::row_to_record(kind, row))
            .collect()
    }

    async fn commit(&self, changes: Vec<Change>) -> Result<()> {
        // Start a transaction
        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change {
                Change::Insert(record) => {
                    Self::insert(&mut tx, record).await?;
                }
                Change::Update(record) => {
                    let (kind, id) = (record.kind(), record.key());
                    if Self::update(&mut tx, record).await? == 0 {
                        return Err(StoreError::RecordNotFound { kind, id });
                    }
                }
                Change::Delete { kind, id } => {
                    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
                    let affected = sqlx::query(&sql)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_constraint_error)?
                        .rows_affected();
                    if affected == 0 {
                        return Err(StoreError::RecordNotFound { kind, id });
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
