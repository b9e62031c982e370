//! Sample data for local runs.

use chrono::{Duration, NaiveDate, Utc};
use common::{CargoId, DriverId, OrderId, UserId, VehicleId};
use domain::{Cargo, Driver, Order, OrderStatus, Vehicle, VehicleType};
use rust_decimal::Decimal;
use store::{Store, StoreExt};

use crate::error::{Result, ServiceError};
use crate::identity::{IdentityProvider, NewUser, ROLE_ADMIN, ROLE_DRIVER, User};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const FIRST_DRIVER_EMAIL: &str = "driver1@example.com";
pub const SECOND_DRIVER_EMAIL: &str = "driver2@example.com";

/// What [`seed_sample_data`] did.
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub admin: User,
    /// False when the store already held data and nothing was written.
    pub seeded: bool,
}

/// Ensures the admin account exists, then fills an empty store with a few
/// vehicles, drivers and orders.
#[tracing::instrument(skip_all)]
pub async fn seed_sample_data<S, I>(store: &S, identity: &I) -> Result<SeedReport>
where
    S: Store + Clone,
    I: IdentityProvider,
{
    let admin = ensure_admin(identity).await?;

    let uow = store.begin();
    let has_data = !uow.repository::<Vehicle>().find(|_| true).await?.is_empty()
        || !uow.repository::<Driver>().find(|_| true).await?.is_empty()
        || !uow.repository::<Order>().find(|_| true).await?.is_empty();
    if has_data {
        tracing::info!("Store already contains data, skipping sample data");
        return Ok(SeedReport {
            admin,
            seeded: false,
        });
    }

    let first_user = ensure_user(
        identity,
        NewUser::with_email(FIRST_DRIVER_EMAIL, "Іван", "Петров", ROLE_DRIVER),
    )
    .await?;
    let second_user = ensure_user(
        identity,
        NewUser::with_email(SECOND_DRIVER_EMAIL, "Олена", "Сидоренко", ROLE_DRIVER),
    )
    .await?;

    let vehicles = [
        vehicle("Mercedes", "Sprinter", "AA1234BC", 2020, VehicleType::Van, 1500.0, 15.0),
        vehicle("Volvo", "FH16", "BB5678DE", 2018, VehicleType::Truck, 20_000.0, 80.0),
        vehicle("Ford", "Transit", "CC9012FG", 2022, VehicleType::Van, 1200.0, 12.0),
    ];
    let drivers = [
        driver("Іван", "Петров", "DRV001", (1985, 5, 10), first_user.id)?,
        driver("Олена", "Сидоренко", "DRV002", (1992, 11, 20), second_user.id)?,
    ];

    let now = Utc::now();
    let first = Order {
        id: OrderId::new(),
        origin_address: "Чернівці, вул. Головна, 1".to_string(),
        destination_address: "Київ, просп. Перемоги, 10".to_string(),
        creation_date: now,
        scheduled_pickup_date: now + Duration::days(1),
        actual_pickup_date: None,
        scheduled_delivery_date: Some(now + Duration::days(3)),
        actual_delivery_date: None,
        status: OrderStatus::Pending,
        total_weight_kg: 500.0,
        total_volume_m3: 3.0,
        price: Decimal::new(250_000, 2),
        notes: Some("Термінова доставка".to_string()),
        driver_id: Some(drivers[0].id),
        vehicle_id: Some(vehicles[0].id),
    };
    let second = Order {
        id: OrderId::new(),
        origin_address: "Львів, пл. Ринок, 1".to_string(),
        destination_address: "Одеса, вул. Дерибасівська, 5".to_string(),
        creation_date: now,
        scheduled_pickup_date: now + Duration::days(2),
        actual_pickup_date: None,
        scheduled_delivery_date: Some(now + Duration::days(7)),
        actual_delivery_date: None,
        status: OrderStatus::InTransit,
        total_weight_kg: 15_000.0,
        total_volume_m3: 50.0,
        price: Decimal::new(1_500_000, 2),
        notes: Some("Збірний вантаж".to_string()),
        driver_id: Some(drivers[1].id),
        vehicle_id: Some(vehicles[1].id),
    };
    let cargo_rows = [
        cargo(first.id, "Електроніка", 200.0, 1.5, 5),
        cargo(first.id, "Запчастини", 300.0, 1.5, 10),
        cargo(second.id, "Будматеріали", 10_000.0, 30.0, 1),
    ];

    let vehicle_repo = uow.repository::<Vehicle>();
    for item in vehicles {
        vehicle_repo.add(item);
    }
    let driver_repo = uow.repository::<Driver>();
    for item in drivers {
        driver_repo.add(item);
    }
    let order_repo = uow.repository::<Order>();
    order_repo.add(first);
    order_repo.add(second);
    let cargo_repo = uow.repository::<Cargo>();
    for item in cargo_rows {
        cargo_repo.add(item);
    }
    let written = uow.complete().await?;

    tracing::info!(rows = written, "Sample data seeded");
    Ok(SeedReport {
        admin,
        seeded: true,
    })
}

/// Returns the admin account, creating it on first use.
pub async fn ensure_admin<I: IdentityProvider>(identity: &I) -> Result<User> {
    ensure_user(
        identity,
        NewUser::with_email(ADMIN_EMAIL, "Super", "Admin", ROLE_ADMIN),
    )
    .await
}

async fn ensure_user<I: IdentityProvider>(identity: &I, user: NewUser) -> Result<User> {
    if let Some(existing) = identity.find_user_by_email(&user.email).await? {
        return Ok(existing);
    }
    Ok(identity.create_user(user).await?)
}

fn vehicle(
    make: &str,
    model: &str,
    license_plate: &str,
    year: i32,
    vehicle_type: VehicleType,
    max_weight_capacity_kg: f64,
    max_volume_capacity_m3: f64,
) -> Vehicle {
    Vehicle {
        id: VehicleId::new(),
        make: make.to_string(),
        model: model.to_string(),
        license_plate: license_plate.to_string(),
        year,
        vehicle_type,
        max_weight_capacity_kg,
        max_volume_capacity_m3,
        is_available: true,
    }
}

fn driver(
    first_name: &str,
    last_name: &str,
    license_number: &str,
    (year, month, day): (i32, u32, u32),
    user_id: UserId,
) -> Result<Driver> {
    let date_of_birth = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ServiceError::BadRequest(format!("Invalid date of birth {year}-{month}-{day}")))?;
    Ok(Driver {
        id: DriverId::new(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        license_number: license_number.to_string(),
        date_of_birth,
        is_available: true,
        user_id,
    })
}

fn cargo(order_id: OrderId, name: &str, weight_kg: f64, volume_m3: f64, quantity: i32) -> Cargo {
    Cargo {
        id: CargoId::new(),
        order_id,
        name: name.to_string(),
        weight_kg,
        volume_m3,
        quantity,
    }
}
