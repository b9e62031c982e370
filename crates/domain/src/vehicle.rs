//! Vehicles and their load capacity.

use common::VehicleId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Kind of vehicle.
///
/// Stored as an integer with an explicit mapping, named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Truck,
    Van,
    Trailer,
    Car,
}

impl VehicleType {
    pub fn as_i16(&self) -> i16 {
        match self {
            VehicleType::Truck => 0,
            VehicleType::Van => 1,
            VehicleType::Trailer => 2,
            VehicleType::Car => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Truck => "Truck",
            VehicleType::Van => "Van",
            VehicleType::Trailer => "Trailer",
            VehicleType::Car => "Car",
        }
    }
}

impl TryFrom<i16> for VehicleType {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(VehicleType::Truck),
            1 => Ok(VehicleType::Van),
            2 => Ok(VehicleType::Trailer),
            3 => Ok(VehicleType::Car),
            other => Err(DomainError::UnknownCode {
                kind: "VehicleType",
                code: other,
            }),
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vehicle that can be assigned to orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    /// Unique across all vehicles.
    pub license_plate: String,
    pub year: i32,
    pub vehicle_type: VehicleType,
    pub max_weight_capacity_kg: f64,
    pub max_volume_capacity_m3: f64,
    pub is_available: bool,
}

impl Vehicle {
    /// Checks that a load of the given weight and volume fits this vehicle.
    ///
    /// Weight is checked first; the error names the exceeded limit and the
    /// requested value.
    pub fn check_capacity(&self, weight_kg: f64, volume_m3: f64) -> Result<(), DomainError> {
        if weight_kg > self.max_weight_capacity_kg {
            return Err(DomainError::CapacityExceeded {
                vehicle_id: self.id.to_string(),
                measure: "weight",
                unit: "kg",
                requested: weight_kg,
                limit: self.max_weight_capacity_kg,
            });
        }
        if volume_m3 > self.max_volume_capacity_m3 {
            return Err(DomainError::CapacityExceeded {
                vehicle_id: self.id.to_string(),
                measure: "volume",
                unit: "m³",
                requested: volume_m3,
                limit: self.max_volume_capacity_m3,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn van() -> Vehicle {
        Vehicle {
            id: VehicleId::new(),
            make: "Mercedes".to_string(),
            model: "Sprinter".to_string(),
            license_plate: "AA1234BC".to_string(),
            year: 2020,
            vehicle_type: VehicleType::Van,
            max_weight_capacity_kg: 1500.0,
            max_volume_capacity_m3: 15.0,
            is_available: true,
        }
    }

    #[test]
    fn test_load_within_capacity() {
        assert!(van().check_capacity(1500.0, 15.0).is_ok());
        assert!(van().check_capacity(10.0, 0.5).is_ok());
    }

    #[test]
    fn test_weight_over_capacity() {
        let err = van().check_capacity(2000.0, 1.0).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2000"));
        assert!(message.contains("1500"));
        assert!(message.contains("weight"));
    }

    #[test]
    fn test_volume_over_capacity() {
        let err = van().check_capacity(100.0, 20.0).unwrap_err();
        assert!(matches!(
            err,
            DomainError::CapacityExceeded {
                measure: "volume",
                ..
            }
        ));
    }

    #[test]
    fn test_vehicle_type_codes_round_trip() {
        for ty in [
            VehicleType::Truck,
            VehicleType::Van,
            VehicleType::Trailer,
            VehicleType::Car,
        ] {
            assert_eq!(VehicleType::try_from(ty.as_i16()).unwrap(), ty);
        }
        assert!(VehicleType::try_from(9).is_err());
    }
}
