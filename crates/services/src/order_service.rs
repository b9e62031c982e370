//! Order use cases.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;
use common::{CargoId, DriverId, OrderId, Page, VehicleId};
use domain::{Cargo, Driver, Order, OrderFilter, OrderGraph, OrderStatus, QueryDescriptor, Vehicle};
use store::{NoInclude, OrderInclude, Store, StoreExt, UnitOfWork};

use crate::error::{Result, ServiceError};
use crate::requests::{CargoRequest, CreateOrderRequest, UpdateOrderRequest};
use crate::views::OrderView;

/// Service for creating, changing and listing orders.
///
/// Every operation opens its own [`UnitOfWork`]. All checks run before the
/// first write is buffered, and writes reach the store in a single commit.
#[derive(Debug, Clone)]
pub struct OrderService<S: Store + Clone> {
    store: S,
}

/// The load an order asks a vehicle to carry.
#[derive(Debug, Clone, Copy)]
struct Load {
    weight_kg: f64,
    volume_m3: f64,
}

impl<S: Store + Clone> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns one page of orders with driver, vehicle and cargo loaded.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        query: &QueryDescriptor<OrderFilter>,
    ) -> Result<Page<OrderView>> {
        let started = Instant::now();
        let uow = self.store.begin();
        let orders = uow
            .repository::<Order>()
            .queryable(OrderInclude::ALL)
            .await?;

        let page = query.execute(orders).map(OrderView::from);
        metrics::histogram!("query_duration_seconds", "entity" => "order")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(total = page.total_count, returned = page.items.len(), "Orders listed");
        Ok(page)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<OrderView> {
        let uow = self.store.begin();
        load_view(&uow, id).await
    }

    /// Creates an order in `Pending` state together with its cargo.
    ///
    /// Any status in the request is ignored.
    #[tracing::instrument(skip(self, request))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderView> {
        request.validate()?;

        let uow = self.store.begin();
        let load = Load {
            weight_kg: request.total_weight_kg,
            volume_m3: request.total_volume_m3,
        };
        if let Some(driver_id) = request.driver_id {
            ensure_driver_exists(&uow, driver_id).await?;
        }
        if let Some(vehicle_id) = request.vehicle_id {
            ensure_vehicle_fits(&uow, vehicle_id, load).await?;
        }

        let order = Order {
            id: OrderId::new(),
            origin_address: request.origin_address,
            destination_address: request.destination_address,
            creation_date: Utc::now(),
            scheduled_pickup_date: request.scheduled_pickup_date,
            actual_pickup_date: None,
            scheduled_delivery_date: request.scheduled_delivery_date,
            actual_delivery_date: None,
            status: OrderStatus::Pending,
            total_weight_kg: request.total_weight_kg,
            total_volume_m3: request.total_volume_m3,
            price: request.price,
            notes: request.notes,
            driver_id: request.driver_id,
            vehicle_id: request.vehicle_id,
        };
        let order_id = order.id;

        uow.repository::<Order>().add(order);
        let cargo = uow.repository::<Cargo>();
        for item in request.cargo {
            cargo.add(new_cargo(order_id, item));
        }
        uow.complete().await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%order_id, "Order created");

        load_view(&self.store.begin(), order_id).await
    }

    /// Replaces every field of an order and reconciles its cargo.
    ///
    /// Cargo lines with an id update that row, lines without one become new
    /// rows, and existing rows not mentioned are deleted. Resending the same
    /// request with new (id-less) lines inserts them again.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_order(&self, id: OrderId, request: UpdateOrderRequest) -> Result<OrderView> {
        if let Some(body_id) = request.id
            && body_id != id
        {
            return Err(ServiceError::BadRequest(format!(
                "Order ID in the path ({id}) does not match the ID in the body ({body_id})."
            )));
        }
        request.validate()?;

        let uow = self.store.begin();
        let existing = uow
            .repository::<Order>()
            .get_by_id(
                id,
                OrderInclude {
                    cargo: true,
                    ..OrderInclude::NONE
                },
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))?;

        let load = Load {
            weight_kg: request.total_weight_kg,
            volume_m3: request.total_volume_m3,
        };
        if let Some(driver_id) = request.driver_id
            && existing.order.driver_id != Some(driver_id)
        {
            ensure_driver_exists(&uow, driver_id).await?;
        }
        if let Some(vehicle_id) = request.vehicle_id {
            let vehicle_changed = existing.order.vehicle_id != Some(vehicle_id);
            let load_changed = existing.order.total_weight_kg != load.weight_kg
                || existing.order.total_volume_m3 != load.volume_m3;
            if vehicle_changed || load_changed {
                ensure_vehicle_fits(&uow, vehicle_id, load).await?;
            }
        }

        let plan = reconcile_cargo(&existing, request.cargo)?;

        let order = Order {
            id,
            origin_address: request.origin_address,
            destination_address: request.destination_address,
            creation_date: existing.order.creation_date,
            scheduled_pickup_date: request.scheduled_pickup_date,
            actual_pickup_date: request.actual_pickup_date,
            scheduled_delivery_date: request.scheduled_delivery_date,
            actual_delivery_date: request.actual_delivery_date,
            status: request.status,
            total_weight_kg: request.total_weight_kg,
            total_volume_m3: request.total_volume_m3,
            price: request.price,
            notes: request.notes,
            driver_id: request.driver_id,
            vehicle_id: request.vehicle_id,
        };

        uow.repository::<Order>().update(order);
        let cargo = uow.repository::<Cargo>();
        for cargo_id in &plan.delete {
            cargo.delete(*cargo_id);
        }
        for item in plan.update {
            cargo.update(item);
        }
        for item in plan.insert {
            cargo.add(item);
        }
        uow.complete().await?;

        metrics::counter!("orders_updated_total").increment(1);
        tracing::info!(order_id = %id, "Order updated");

        load_view(&self.store.begin(), id).await
    }

    /// Deletes an order and its cargo.
    ///
    /// Returns `false` if no such order exists. Orders that are picked up or
    /// in transit cannot be deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let uow = self.store.begin();
        let orders = uow.repository::<Order>();
        let Some(existing) = orders.get_by_id(id, OrderInclude::NONE).await? else {
            return Ok(false);
        };

        if existing.order.status.is_in_transit() {
            return Err(ServiceError::Conflict(format!(
                "Order {id} cannot be deleted while its status is {}.",
                existing.order.status
            )));
        }

        orders.delete(id);
        uow.complete().await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(order_id = %id, "Order deleted");
        Ok(true)
    }
}

async fn load_view<S: Store + Clone>(uow: &UnitOfWork<S>, id: OrderId) -> Result<OrderView> {
    uow.repository::<Order>()
        .get_by_id(id, OrderInclude::ALL)
        .await?
        .map(OrderView::from)
        .ok_or_else(|| ServiceError::not_found("Order", id))
}

async fn ensure_driver_exists<S: Store + Clone>(uow: &UnitOfWork<S>, id: DriverId) -> Result<()> {
    if uow.repository::<Driver>().exists(id).await? {
        Ok(())
    } else {
        Err(ServiceError::not_found("Driver", id))
    }
}

async fn ensure_vehicle_fits<S: Store + Clone>(
    uow: &UnitOfWork<S>,
    id: VehicleId,
    load: Load,
) -> Result<()> {
    let vehicle = uow
        .repository::<Vehicle>()
        .get_by_id(id, NoInclude)
        .await?
        .ok_or_else(|| ServiceError::not_found("Vehicle", id))?;
    vehicle.check_capacity(load.weight_kg, load.volume_m3)?;
    Ok(())
}

fn new_cargo(order_id: OrderId, item: CargoRequest) -> Cargo {
    Cargo {
        id: CargoId::new(),
        order_id,
        name: item.name,
        weight_kg: item.weight_kg,
        volume_m3: item.volume_m3,
        quantity: item.quantity,
    }
}

/// Writes needed to turn an order's stored cargo into the requested set.
#[derive(Debug, Default)]
struct CargoPlan {
    insert: Vec<Cargo>,
    update: Vec<Cargo>,
    delete: Vec<CargoId>,
}

fn reconcile_cargo(existing: &OrderGraph, requested: Vec<CargoRequest>) -> Result<CargoPlan> {
    let order_id = existing.id();
    let stored: HashMap<CargoId, &Cargo> = existing.cargo.iter().map(|c| (c.id, c)).collect();
    let mut kept: HashSet<CargoId> = HashSet::new();
    let mut plan = CargoPlan::default();

    for item in requested {
        match item.existing_id() {
            Some(cargo_id) => {
                if !stored.contains_key(&cargo_id) {
                    return Err(ServiceError::BadRequest(format!(
                        "Cargo with ID {cargo_id} does not belong to order {order_id}."
                    )));
                }
                if !kept.insert(cargo_id) {
                    return Err(ServiceError::BadRequest(format!(
                        "Cargo with ID {cargo_id} appears more than once."
                    )));
                }
                plan.update.push(Cargo {
                    id: cargo_id,
                    order_id,
                    name: item.name,
                    weight_kg: item.weight_kg,
                    volume_m3: item.volume_m3,
                    quantity: item.quantity,
                });
            }
            None => plan.insert.push(new_cargo(order_id, item)),
        }
    }

    plan.delete = existing
        .cargo
        .iter()
        .map(|c| c.id)
        .filter(|id| !kept.contains(id))
        .collect();
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn cargo(order_id: OrderId, name: &str) -> Cargo {
        Cargo {
            id: CargoId::new(),
            order_id,
            name: name.to_string(),
            weight_kg: 10.0,
            volume_m3: 1.0,
            quantity: 1,
        }
    }

    fn graph_with(names: &[&str]) -> OrderGraph {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let order = Order {
            id: OrderId::new(),
            origin_address: "Kyiv".to_string(),
            destination_address: "Lviv".to_string(),
            creation_date: created,
            scheduled_pickup_date: created,
            actual_pickup_date: None,
            scheduled_delivery_date: None,
            actual_delivery_date: None,
            status: OrderStatus::Pending,
            total_weight_kg: 30.0,
            total_volume_m3: 3.0,
            price: dec!(100),
            notes: None,
            driver_id: None,
            vehicle_id: None,
        };
        let items = names.iter().map(|n| cargo(order.id, n)).collect();
        OrderGraph {
            cargo: items,
            ..OrderGraph::bare(order)
        }
    }

    fn line(id: Option<CargoId>, name: &str) -> CargoRequest {
        CargoRequest {
            id,
            name: name.to_string(),
            weight_kg: 5.0,
            volume_m3: 0.5,
            quantity: 3,
        }
    }

    #[test]
    fn reconcile_splits_insert_update_delete() {
        let existing = graph_with(&["A", "B", "C"]);
        let a = existing.cargo[0].id;
        let c = existing.cargo[2].id;

        let plan = reconcile_cargo(
            &existing,
            vec![line(Some(a), "A2"), line(None, "D"), line(Some(c), "C2")],
        )
        .unwrap();

        assert_eq!(plan.update.len(), 2);
        assert!(plan.update.iter().any(|u| u.id == a && u.name == "A2"));
        assert_eq!(plan.insert.len(), 1);
        assert_eq!(plan.insert[0].name, "D");
        assert_eq!(plan.insert[0].order_id, existing.id());
        assert_eq!(plan.delete, vec![existing.cargo[1].id]);
    }

    #[test]
    fn reconcile_rejects_foreign_cargo_id() {
        let existing = graph_with(&["A"]);
        let result = reconcile_cargo(&existing, vec![line(Some(CargoId::new()), "X")]);
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn reconcile_rejects_duplicate_ids() {
        let existing = graph_with(&["A"]);
        let a = existing.cargo[0].id;
        let result = reconcile_cargo(&existing, vec![line(Some(a), "A"), line(Some(a), "A")]);
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn empty_request_removes_all_cargo() {
        let existing = graph_with(&["A", "B"]);
        let plan = reconcile_cargo(&existing, Vec::new()).unwrap();
        assert!(plan.insert.is_empty());
        assert!(plan.update.is_empty());
        assert_eq!(plan.delete.len(), 2);
    }
}
