//! Order status.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Where an order is in its delivery lifecycle.
///
/// Status is caller-controlled on update; the only enforced rules are that
/// new orders start as `Pending` and that an order cannot be deleted while
/// the cargo is on the road (`PickedUp` or `InTransit`).
///
/// On the wire the status is a named string. In storage it is a small
/// integer with an explicit mapping (see [`OrderStatus::as_i16`]), so
/// reordering the variants never changes persisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Waiting for a driver and vehicle.
    #[default]
    Pending,

    /// Driver and vehicle assigned.
    Assigned,

    /// Cargo collected from the origin.
    PickedUp,

    /// On the way to the destination.
    InTransit,

    /// Handed over at the destination.
    Delivered,

    /// Cancelled before delivery.
    Cancelled,

    /// Something went wrong (damage, delay, ...).
    Problem,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Problem,
    ];

    /// Returns true while the cargo is physically on the road.
    ///
    /// Orders in these states cannot be deleted.
    pub fn is_in_transit(&self) -> bool {
        matches!(self, OrderStatus::PickedUp | OrderStatus::InTransit)
    }

    /// Returns true for states that still need the assigned driver.
    ///
    /// A driver with any order in these states cannot be deleted.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Assigned
                | OrderStatus::PickedUp
                | OrderStatus::InTransit
        )
    }

    /// Storage code for this status.
    pub fn as_i16(&self) -> i16 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Assigned => 1,
            OrderStatus::PickedUp => 2,
            OrderStatus::InTransit => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => 5,
            OrderStatus::Problem => 6,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Assigned => "Assigned",
            OrderStatus::PickedUp => "PickedUp",
            OrderStatus::InTransit => "InTransit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Problem => "Problem",
        }
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Assigned),
            2 => Ok(OrderStatus::PickedUp),
            3 => Ok(OrderStatus::InTransit),
            4 => Ok(OrderStatus::Delivered),
            5 => Ok(OrderStatus::Cancelled),
            6 => Ok(OrderStatus::Problem),
            other => Err(DomainError::UnknownCode {
                kind: "OrderStatus",
                code: other,
            }),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    /// Parses a status name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownName {
                kind: "OrderStatus",
                name: s.to_string(),
            })
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
