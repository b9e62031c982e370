//! Order listing filters and sort fields.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{QuerySpec, cmp_text, contains_ignore_case};
use crate::order::{OrderGraph, OrderStatus};

/// Optional constraints on an order listing. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub origin_address: Option<String>,
    pub destination_address: Option<String>,
    pub status: Option<OrderStatus>,
    /// First creation day included.
    pub creation_date_from: Option<NaiveDate>,
    /// Last creation day included (the whole day counts).
    pub creation_date_to: Option<NaiveDate>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortField {
    CreationDate,
    ScheduledPickupDate,
    Price,
    Status,
    OriginAddress,
    DestinationAddress,
    DriverFirstName,
    VehicleLicensePlate,
}

impl QuerySpec for OrderFilter {
    type Item = OrderGraph;
    type SortField = OrderSortField;

    const DEFAULT_SORT: OrderSortField = OrderSortField::CreationDate;

    fn parse_sort_field(name: &str) -> Option<OrderSortField> {
        let field = match name.to_ascii_lowercase().as_str() {
            "creationdate" => OrderSortField::CreationDate,
            "scheduledpickupdate" => OrderSortField::ScheduledPickupDate,
            "price" => OrderSortField::Price,
            "status" => OrderSortField::Status,
            "originaddress" => OrderSortField::OriginAddress,
            "destinationaddress" => OrderSortField::DestinationAddress,
            "driverfirstname" => OrderSortField::DriverFirstName,
            "vehiclelicenseplate" => OrderSortField::VehicleLicensePlate,
            _ => return None,
        };
        Some(field)
    }

    fn matches(&self, item: &OrderGraph) -> bool {
        let order = &item.order;

        if !contains_ignore_case(&order.origin_address, self.origin_address.as_deref()) {
            return false;
        }
        if !contains_ignore_case(
            &order.destination_address,
            self.destination_address.as_deref(),
        ) {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        let created_on = order.creation_date.date_naive();
        if let Some(from) = self.creation_date_from
            && created_on < from
        {
            return false;
        }
        if let Some(to) = self.creation_date_to
            && created_on > to
        {
            return false;
        }
        if let Some(min) = self.min_price
            && order.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && order.price > max
        {
            return false;
        }
        true
    }

    fn compare(field: OrderSortField, a: &OrderGraph, b: &OrderGraph) -> Ordering {
        let (x, y) = (&a.order, &b.order);
        match field {
            OrderSortField::CreationDate => x.creation_date.cmp(&y.creation_date),
            OrderSortField::ScheduledPickupDate => {
                x.scheduled_pickup_date.cmp(&y.scheduled_pickup_date)
            }
            OrderSortField::Price => x.price.cmp(&y.price),
            OrderSortField::Status => x.status.as_i16().cmp(&y.status.as_i16()),
            OrderSortField::OriginAddress => cmp_text(&x.origin_address, &y.origin_address),
            OrderSortField::DestinationAddress => {
                cmp_text(&x.destination_address, &y.destination_address)
            }
            // Orders without a driver or vehicle sort first.
            OrderSortField::DriverFirstName => {
                match (a.driver.as_ref(), b.driver.as_ref()) {
                    (Some(da), Some(db)) => cmp_text(&da.first_name, &db.first_name),
                    (da, db) => da.is_some().cmp(&db.is_some()),
                }
            }
            OrderSortField::VehicleLicensePlate => {
                match (a.vehicle.as_ref(), b.vehicle.as_ref()) {
                    (Some(va), Some(vb)) => cmp_text(&va.license_plate, &vb.license_plate),
                    (va, vb) => va.is_some().cmp(&vb.is_some()),
                }
            }
        }
    }

    fn id_of(item: &OrderGraph) -> Uuid {
        item.order.id.as_uuid()
    }
}
