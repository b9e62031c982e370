//! Integration tests for order use cases over the in-memory store.

use chrono::{Duration, NaiveDate, Utc};
use common::{DriverId, OrderId, UserId, VehicleId};
use domain::{
    Driver, Order, OrderFilter, OrderStatus, PageRequest, QueryDescriptor, SortOrder, Vehicle,
    VehicleType,
};
use rust_decimal_macros::dec;
use services::{
    CargoRequest, CreateOrderRequest, OrderService, ServiceError, UpdateOrderRequest,
};
use store::{EntityKind, InMemoryStore, StoreExt};

struct TestHarness {
    store: InMemoryStore,
    orders: OrderService<InMemoryStore>,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let orders = OrderService::new(store.clone());
        Self { store, orders }
    }

    async fn add_vehicle(&self, plate: &str, max_weight_kg: f64) -> VehicleId {
        let vehicle = Vehicle {
            id: VehicleId::new(),
            make: "Mercedes".to_string(),
            model: "Sprinter".to_string(),
            license_plate: plate.to_string(),
            year: 2020,
            vehicle_type: VehicleType::Van,
            max_weight_capacity_kg: max_weight_kg,
            max_volume_capacity_m3: 15.0,
            is_available: true,
        };
        let id = vehicle.id;
        let uow = self.store.begin();
        uow.repository::<Vehicle>().add(vehicle);
        uow.complete().await.unwrap();
        id
    }

    async fn add_driver(&self, license: &str) -> DriverId {
        let driver = Driver {
            id: DriverId::new(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            license_number: license.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 5, 10).unwrap(),
            is_available: true,
            user_id: UserId::new(),
        };
        let id = driver.id;
        let uow = self.store.begin();
        uow.repository::<Driver>().add(driver);
        uow.complete().await.unwrap();
        id
    }

    async fn order_count(&self) -> usize {
        self.store.row_count(EntityKind::Order).await
    }
}

fn cargo_line(name: &str) -> CargoRequest {
    CargoRequest {
        id: None,
        name: name.to_string(),
        weight_kg: 100.0,
        volume_m3: 1.0,
        quantity: 2,
    }
}

fn create_request(total_weight_kg: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        origin_address: "Kyiv, Khreshchatyk 1".to_string(),
        destination_address: "Lviv, Rynok Square 1".to_string(),
        scheduled_pickup_date: Utc::now() + Duration::days(1),
        scheduled_delivery_date: Some(Utc::now() + Duration::days(3)),
        status: Some(OrderStatus::Delivered),
        total_weight_kg,
        total_volume_m3: 5.0,
        price: dec!(2500.00),
        notes: None,
        driver_id: None,
        vehicle_id: None,
        cargo: vec![cargo_line("Electronics"), cargo_line("Spare parts")],
    }
}

fn update_from(order: &services::OrderView) -> UpdateOrderRequest {
    UpdateOrderRequest {
        id: Some(order.id),
        origin_address: order.origin_address.clone(),
        destination_address: order.destination_address.clone(),
        scheduled_pickup_date: order.scheduled_pickup_date,
        actual_pickup_date: None,
        scheduled_delivery_date: order.scheduled_delivery_date,
        actual_delivery_date: None,
        status: order.status,
        total_weight_kg: order.total_weight_kg,
        total_volume_m3: order.total_volume_m3,
        price: order.price,
        notes: order.notes.clone(),
        driver_id: order.driver.as_ref().map(|d| d.id),
        vehicle_id: order.vehicle.as_ref().map(|v| v.id),
        cargo: order
            .cargo
            .iter()
            .map(|c| CargoRequest {
                id: Some(c.id),
                name: c.name.clone(),
                weight_kg: c.weight_kg,
                volume_m3: c.volume_m3,
                quantity: c.quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_overweight_order_is_rejected() {
    let h = TestHarness::new();
    let vehicle_id = h.add_vehicle("AA1234BC", 1500.0).await;

    let mut request = create_request(2000.0);
    request.vehicle_id = Some(vehicle_id);
    let err = h.orders.create_order(request).await.unwrap_err();

    let ServiceError::BadRequest(message) = err else {
        panic!("expected bad request, got {err:?}");
    };
    assert!(message.contains("1500"));
    assert!(message.contains("2000"));
    assert_eq!(h.order_count().await, 0);
}

#[tokio::test]
async fn test_order_within_capacity_is_created_pending() {
    let h = TestHarness::new();
    let vehicle_id = h.add_vehicle("BB5678DE", 2500.0).await;
    let driver_id = h.add_driver("DRV001").await;

    let mut request = create_request(2000.0);
    request.vehicle_id = Some(vehicle_id);
    request.driver_id = Some(driver_id);
    let cargo_count = request.cargo.len();

    let order = h.orders.create_order(request).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.cargo.len(), cargo_count);
    assert_eq!(order.vehicle.as_ref().unwrap().license_plate, "BB5678DE");
    assert_eq!(order.driver.as_ref().unwrap().license_number, "DRV001");
    assert_eq!(h.order_count().await, 1);

    let fetched = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(fetched, order);
}

#[tokio::test]
async fn test_unknown_driver_or_vehicle_is_not_found() {
    let h = TestHarness::new();

    let mut request = create_request(100.0);
    request.driver_id = Some(DriverId::new());
    let err = h.orders.create_order(request).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let mut request = create_request(100.0);
    request.vehicle_id = Some(VehicleId::new());
    let err = h.orders.create_order(request).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    assert_eq!(h.order_count().await, 0);
}

#[tokio::test]
async fn test_invalid_request_is_validation_error() {
    let h = TestHarness::new();
    let mut request = create_request(100.0);
    request.origin_address = String::new();
    request.cargo[0].quantity = 0;

    let err = h.orders.create_order(request).await.unwrap_err();
    let ServiceError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors.field("originAddress").is_some());
    assert!(errors.field("cargo[0].quantity").is_some());
}

#[tokio::test]
async fn test_get_missing_order_is_not_found() {
    let h = TestHarness::new();
    let err = h.orders.get_order(OrderId::new()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_update_reconciles_cargo() {
    let h = TestHarness::new();
    let created = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();
    assert_eq!(created.cargo.len(), 2);

    let kept = created.cargo[0].clone();
    let removed = created.cargo[1].id;

    let mut request = update_from(&created);
    request.cargo = vec![
        CargoRequest {
            id: Some(kept.id),
            name: "Electronics (fragile)".to_string(),
            weight_kg: 150.0,
            volume_m3: kept.volume_m3,
            quantity: kept.quantity,
        },
        cargo_line("Furniture"),
    ];

    let updated = h.orders.update_order(created.id, request).await.unwrap();

    assert_eq!(updated.cargo.len(), 2);
    let kept_after = updated.cargo.iter().find(|c| c.id == kept.id).unwrap();
    assert_eq!(kept_after.name, "Electronics (fragile)");
    assert_eq!(kept_after.weight_kg, 150.0);
    assert!(updated.cargo.iter().all(|c| c.id != removed));
    assert!(updated.cargo.iter().any(|c| c.name == "Furniture"));
    assert_eq!(h.store.row_count(EntityKind::Cargo).await, 2);
}

#[tokio::test]
async fn test_update_with_stable_ids_is_idempotent() {
    let h = TestHarness::new();
    let created = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();

    let mut request = update_from(&created);
    request.status = OrderStatus::Assigned;
    request.notes = Some("Call before arrival".to_string());

    let first = h
        .orders
        .update_order(created.id, request.clone())
        .await
        .unwrap();
    let second = h.orders.update_order(created.id, request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.status, OrderStatus::Assigned);
    assert_eq!(second.creation_date, created.creation_date);
}

#[tokio::test]
async fn test_update_with_foreign_cargo_id_is_rejected() {
    let h = TestHarness::new();
    let first = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();
    let other = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();

    let mut request = update_from(&first);
    request.cargo[0].id = Some(other.cargo[0].id);

    let err = h.orders.update_order(first.id, request).await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    // Nothing changed
    let reloaded = h.orders.get_order(first.id).await.unwrap();
    assert_eq!(reloaded, first);
}

#[tokio::test]
async fn test_update_checks_new_vehicle_capacity() {
    let h = TestHarness::new();
    let small = h.add_vehicle("CC9012FG", 1200.0).await;
    let created = h
        .orders
        .create_order(create_request(1500.0))
        .await
        .unwrap();

    let mut request = update_from(&created);
    request.vehicle_id = Some(small);
    let err = h.orders.update_order(created.id, request).await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_update_same_vehicle_rejects_heavier_load() {
    let h = TestHarness::new();
    let van = h.add_vehicle("AA1234BC", 1500.0).await;
    let mut request = create_request(1000.0);
    request.vehicle_id = Some(van);
    let created = h.orders.create_order(request).await.unwrap();

    let mut request = update_from(&created);
    request.total_weight_kg = 1600.0;
    let err = h.orders.update_order(created.id, request).await.unwrap_err();

    let ServiceError::BadRequest(message) = err else {
        panic!("expected bad request, got {err:?}");
    };
    assert!(message.contains("Max weight capacity: 1500"));
    let reloaded = h.orders.get_order(created.id).await.unwrap();
    assert_eq!(reloaded, created);
    assert_eq!(reloaded.total_weight_kg, 1000.0);
}

#[tokio::test]
async fn test_update_same_vehicle_rejects_bulkier_load() {
    let h = TestHarness::new();
    let van = h.add_vehicle("AA1234BC", 1500.0).await;
    let mut request = create_request(1000.0);
    request.vehicle_id = Some(van);
    let created = h.orders.create_order(request).await.unwrap();

    let mut request = update_from(&created);
    request.total_volume_m3 = 20.0;
    let err = h.orders.update_order(created.id, request).await.unwrap_err();

    let ServiceError::BadRequest(message) = err else {
        panic!("expected bad request, got {err:?}");
    };
    assert!(message.contains("Max volume capacity: 15"));
    let reloaded = h.orders.get_order(created.id).await.unwrap();
    assert_eq!(reloaded, created);
    assert_eq!(reloaded.total_volume_m3, 5.0);
}

#[tokio::test]
async fn test_update_path_body_mismatch() {
    let h = TestHarness::new();
    let created = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();

    let request = update_from(&created);
    let err = h
        .orders
        .update_order(OrderId::new(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_update_missing_order_is_not_found() {
    let h = TestHarness::new();
    let created = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();
    let mut request = update_from(&created);
    request.id = None;

    let err = h
        .orders
        .update_order(OrderId::new(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_in_transit_order_cannot_be_deleted() {
    let h = TestHarness::new();
    let created = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();

    for status in [OrderStatus::PickedUp, OrderStatus::InTransit] {
        let mut request = update_from(&created);
        request.status = status;
        h.orders.update_order(created.id, request).await.unwrap();

        let err = h.orders.delete_order(created.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(h.orders.get_order(created.id).await.is_ok());
    }
}

#[tokio::test]
async fn test_delete_order_removes_cargo() {
    let h = TestHarness::new();
    let created = h
        .orders
        .create_order(create_request(500.0))
        .await
        .unwrap();

    assert!(h.orders.delete_order(created.id).await.unwrap());
    assert_eq!(h.order_count().await, 0);
    assert_eq!(h.store.row_count(EntityKind::Cargo).await, 0);

    assert!(!h.orders.delete_order(created.id).await.unwrap());
}

#[tokio::test]
async fn test_list_orders_filters_sorts_and_pages() {
    let h = TestHarness::new();
    for (origin, weight) in [("Kyiv", 300.0), ("Kharkiv", 100.0), ("Lviv", 200.0), ("Kyiv-2", 400.0)]
    {
        let mut request = create_request(weight);
        request.origin_address = origin.to_string();
        request.price = rust_decimal::Decimal::from(weight as i64);
        h.orders.create_order(request).await.unwrap();
    }

    let query = QueryDescriptor::new(OrderFilter {
        origin_address: Some("k".to_string()),
        ..Default::default()
    })
    .sort_by("Price", SortOrder::Desc)
    .page(PageRequest::new(1, 2).unwrap());

    let page = h.orders.list_orders(&query).await.unwrap();

    assert_eq!(page.total_count, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].origin_address, "Kyiv-2");
    assert_eq!(page.items[1].origin_address, "Kyiv");
}

#[tokio::test]
async fn test_deleting_vehicle_clears_order_reference() {
    let h = TestHarness::new();
    let vehicle_id = h.add_vehicle("AA1234BC", 1500.0).await;
    let mut request = create_request(500.0);
    request.vehicle_id = Some(vehicle_id);
    let created = h.orders.create_order(request).await.unwrap();

    let uow = h.store.begin();
    uow.repository::<Vehicle>().delete(vehicle_id);
    uow.complete().await.unwrap();

    let reloaded = h.orders.get_order(created.id).await.unwrap();
    assert!(reloaded.vehicle.is_none());

    let uow = h.store.begin();
    let stored = uow
        .repository::<Order>()
        .find(|o| o.id == created.id)
        .await
        .unwrap();
    assert_eq!(stored[0].vehicle_id, None);
}
