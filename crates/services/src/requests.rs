//! Inbound request bodies and their field-level validation.
//!
//! Every request is validated before the owning service touches storage.
//! Field names in errors use the JSON (camelCase) names so clients can map
//! messages back onto their forms.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::{CargoId, DriverId, OrderId, UserId, VehicleId};
use domain::driver::{MAX_DRIVER_AGE, MAX_NAME_LEN, MIN_DRIVER_AGE};
use domain::order::{
    MAX_ADDRESS_LEN, MAX_CARGO_NAME_LEN, MAX_CARGO_VOLUME_M3, MAX_CARGO_WEIGHT_KG,
    MAX_NOTES_LEN, MIN_CARGO_VOLUME_M3, MIN_CARGO_WEIGHT_KG,
};
use domain::validation::{age_on, license_number, price, required_text};
use domain::{OrderStatus, ValidationErrors};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// How far in the past a new pickup may be scheduled, to absorb clock skew.
const PICKUP_GRACE_MINUTES: i64 = 5;

/// One cargo line in a create or update request.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CargoRequest {
    /// Existing cargo to update. Absent or nil inserts a new row.
    #[serde(default)]
    pub id: Option<CargoId>,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_CARGO_NAME_LEN, message = "Cargo name cannot exceed 100 characters.")
    )]
    pub name: String,
    #[validate(range(
        min = MIN_CARGO_WEIGHT_KG,
        max = MAX_CARGO_WEIGHT_KG,
        message = "Cargo weight must be between 0.01 and 100000 kg."
    ))]
    pub weight_kg: f64,
    #[validate(range(
        min = MIN_CARGO_VOLUME_M3,
        max = MAX_CARGO_VOLUME_M3,
        message = "Cargo volume must be between 0.01 and 10000 m3."
    ))]
    pub volume_m3: f64,
    #[validate(range(min = 1, message = "Cargo quantity must be at least 1."))]
    pub quantity: i32,
}

impl CargoRequest {
    /// The id of the existing row this line refers to, if any.
    pub fn existing_id(&self) -> Option<CargoId> {
        self.id.filter(|id| !id.is_nil())
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_ADDRESS_LEN, message = "Origin address cannot exceed 250 characters.")
    )]
    pub origin_address: String,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_ADDRESS_LEN, message = "Destination address cannot exceed 250 characters.")
    )]
    pub destination_address: String,
    pub scheduled_pickup_date: DateTime<Utc>,
    #[serde(default)]
    pub scheduled_delivery_date: Option<DateTime<Utc>>,
    /// Accepted for compatibility and ignored: new orders are always `Pending`.
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[validate(range(exclusive_min = 0.0, message = "Total weight must be greater than 0."))]
    pub total_weight_kg: f64,
    #[validate(range(exclusive_min = 0.0, message = "Total volume must be greater than 0."))]
    pub total_volume_m3: f64,
    #[validate(custom(function = "price"))]
    pub price: Decimal,
    #[serde(default)]
    #[validate(length(max = MAX_NOTES_LEN, message = "Notes cannot exceed 1000 characters."))]
    pub notes: Option<String>,
    #[serde(default)]
    pub driver_id: Option<DriverId>,
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    #[validate(nested)]
    pub cargo: Vec<CargoRequest>,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_at(Utc::now())
    }

    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::of(self);
        check_schedule(
            &mut errors,
            self.scheduled_pickup_date,
            self.scheduled_delivery_date,
        );
        if self.scheduled_pickup_date < now - Duration::minutes(PICKUP_GRACE_MINUTES) {
            errors.add(
                "scheduledPickupDate",
                "Scheduled pickup date cannot be in the past.",
            );
        }
        errors.into_result()
    }
}

/// Body of `PUT /orders/{id}`. A full replacement of the order's fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    /// Must match the path id when present.
    #[serde(default)]
    pub id: Option<OrderId>,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_ADDRESS_LEN, message = "Origin address cannot exceed 250 characters.")
    )]
    pub origin_address: String,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_ADDRESS_LEN, message = "Destination address cannot exceed 250 characters.")
    )]
    pub destination_address: String,
    pub scheduled_pickup_date: DateTime<Utc>,
    #[serde(default)]
    pub actual_pickup_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    #[validate(range(exclusive_min = 0.0, message = "Total weight must be greater than 0."))]
    pub total_weight_kg: f64,
    #[validate(range(exclusive_min = 0.0, message = "Total volume must be greater than 0."))]
    pub total_volume_m3: f64,
    #[validate(custom(function = "price"))]
    pub price: Decimal,
    #[serde(default)]
    #[validate(length(max = MAX_NOTES_LEN, message = "Notes cannot exceed 1000 characters."))]
    pub notes: Option<String>,
    #[serde(default)]
    pub driver_id: Option<DriverId>,
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    #[validate(nested)]
    pub cargo: Vec<CargoRequest>,
}

impl UpdateOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_at(Utc::now())
    }

    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::of(self);
        check_schedule(
            &mut errors,
            self.scheduled_pickup_date,
            self.scheduled_delivery_date,
        );

        if let Some(picked_up) = self.actual_pickup_date
            && picked_up > now
        {
            errors.add("actualPickupDate", "Actual pickup date cannot be in the future.");
        }
        if let Some(delivered) = self.actual_delivery_date {
            if delivered > now {
                errors.add(
                    "actualDeliveryDate",
                    "Actual delivery date cannot be in the future.",
                );
            }
            if let Some(picked_up) = self.actual_pickup_date
                && delivered < picked_up
            {
                errors.add(
                    "actualDeliveryDate",
                    "Actual delivery date cannot be before the actual pickup date.",
                );
            }
        }
        errors.into_result()
    }
}

fn check_schedule(
    errors: &mut ValidationErrors,
    pickup: DateTime<Utc>,
    delivery: Option<DateTime<Utc>>,
) {
    if let Some(delivery) = delivery
        && delivery <= pickup
    {
        errors.add(
            "scheduledDeliveryDate",
            "Scheduled delivery date must be after the scheduled pickup date.",
        );
    }
}

/// Body of `POST /drivers`.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_NAME_LEN, message = "First name cannot exceed 50 characters.")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_NAME_LEN, message = "Last name cannot exceed 50 characters.")
    )]
    pub last_name: String,
    #[validate(custom(function = "license_number"))]
    pub license_number: String,
    pub date_of_birth: NaiveDate,
    #[validate(custom(function = "known_user"))]
    pub user_id: UserId,
}

impl CreateDriverRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_on(Utc::now().date_naive())
    }

    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::of(self);
        check_age(&mut errors, self.date_of_birth, today);
        errors.into_result()
    }
}

/// Body of `PUT /drivers/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverRequest {
    #[validate(custom(function = "known_driver"))]
    pub id: DriverId,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_NAME_LEN, message = "First name cannot exceed 50 characters.")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "required_text"),
        length(max = MAX_NAME_LEN, message = "Last name cannot exceed 50 characters.")
    )]
    pub last_name: String,
    #[validate(custom(function = "license_number"))]
    pub license_number: String,
    pub date_of_birth: NaiveDate,
    pub is_available: bool,
    #[validate(custom(function = "known_user"))]
    pub user_id: UserId,
}

impl UpdateDriverRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_on(Utc::now().date_naive())
    }

    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::of(self);
        check_age(&mut errors, self.date_of_birth, today);
        errors.into_result()
    }
}

fn known_user(id: &UserId) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("required").with_message("User ID is required.".into()));
    }
    Ok(())
}

fn known_driver(id: &DriverId) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("required").with_message("Driver ID is required.".into()));
    }
    Ok(())
}

fn check_age(errors: &mut ValidationErrors, date_of_birth: NaiveDate, today: NaiveDate) {
    let age = age_on(date_of_birth, today);
    if !(MIN_DRIVER_AGE..=MAX_DRIVER_AGE).contains(&age) {
        errors.add(
            "dateOfBirth",
            format!(
                "Driver must be at least {MIN_DRIVER_AGE} years old and not older than {MAX_DRIVER_AGE}."
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn cargo(name: &str) -> CargoRequest {
        CargoRequest {
            id: None,
            name: name.to_string(),
            weight_kg: 100.0,
            volume_m3: 1.0,
            quantity: 2,
        }
    }

    fn create_request() -> CreateOrderRequest {
        CreateOrderRequest {
            origin_address: "Kyiv, Khreshchatyk 1".to_string(),
            destination_address: "Lviv, Svobody 10".to_string(),
            scheduled_pickup_date: now() + Duration::days(1),
            scheduled_delivery_date: Some(now() + Duration::days(2)),
            status: None,
            total_weight_kg: 500.0,
            total_volume_m3: 3.0,
            price: dec!(2500),
            notes: None,
            driver_id: None,
            vehicle_id: None,
            cargo: vec![cargo("Electronics")],
        }
    }

    #[test]
    fn valid_create_request_passes() {
        assert!(create_request().validate_at(now()).is_ok());
    }

    #[test]
    fn create_request_reports_every_failing_field() {
        let mut request = create_request();
        request.origin_address = "  ".to_string();
        request.total_weight_kg = 0.0;
        request.price = Decimal::ZERO;
        request.scheduled_pickup_date = now() - Duration::hours(1);

        let errors = request.validate_at(now()).unwrap_err();
        assert!(errors.field("originAddress").is_some());
        assert!(errors.field("totalWeightKg").is_some());
        assert!(errors.field("price").is_some());
        assert!(errors.field("scheduledPickupDate").is_some());
        assert!(errors.field("destinationAddress").is_none());
    }

    #[test]
    fn delivery_must_follow_pickup() {
        let mut request = create_request();
        request.scheduled_delivery_date = Some(request.scheduled_pickup_date);
        let errors = request.validate_at(now()).unwrap_err();
        assert!(errors.field("scheduledDeliveryDate").is_some());
    }

    #[test]
    fn cargo_errors_are_indexed() {
        let mut request = create_request();
        let mut bad = cargo("");
        bad.quantity = 0;
        bad.weight_kg = 200_000.0;
        request.cargo.push(bad);

        let errors = request.validate_at(now()).unwrap_err();
        assert!(errors.field("cargo[0].name").is_none());
        assert!(errors.field("cargo[1].name").is_some());
        assert!(errors.field("cargo[1].quantity").is_some());
        assert!(errors.field("cargo[1].weightKg").is_some());
        assert!(errors.field("cargo[1].volumeM3").is_none());
    }

    #[test]
    fn price_must_fit_two_decimal_places() {
        let mut request = create_request();
        request.price = dec!(10.005);
        let errors = request.validate_at(now()).unwrap_err();
        assert_eq!(
            errors.field("price").unwrap(),
            ["Price cannot have more than 2 decimal places."]
        );

        request.price = dec!(10.50);
        assert!(request.validate_at(now()).is_ok());
    }

    #[test]
    fn price_must_fit_sixteen_integer_digits() {
        let mut request = create_request();
        request.price = dec!(10000000000000000);
        let errors = request.validate_at(now()).unwrap_err();
        assert!(errors.field("price").is_some());
        assert_eq!(errors.fields().count(), 1);

        request.price = dec!(9999999999999999.99);
        assert!(request.validate_at(now()).is_ok());
    }

    #[test]
    fn update_request_checks_price_precision() {
        let mut request = update_request();
        request.price = dec!(0.001);
        let errors = request.validate_at(now()).unwrap_err();
        assert!(errors.field("price").is_some());
    }

    #[test]
    fn nil_cargo_id_means_new() {
        let mut item = cargo("Parts");
        item.id = Some(CargoId::from_uuid(uuid::Uuid::nil()));
        assert_eq!(item.existing_id(), None);

        let id = CargoId::new();
        item.id = Some(id);
        assert_eq!(item.existing_id(), Some(id));
    }

    fn update_request() -> UpdateOrderRequest {
        UpdateOrderRequest {
            id: None,
            origin_address: "Kyiv".to_string(),
            destination_address: "Odesa".to_string(),
            scheduled_pickup_date: now() - Duration::days(3),
            actual_pickup_date: Some(now() - Duration::days(2)),
            scheduled_delivery_date: None,
            actual_delivery_date: Some(now() + Duration::days(1)),
            status: OrderStatus::Delivered,
            total_weight_kg: 10.0,
            total_volume_m3: 1.0,
            price: dec!(100.50),
            notes: Some("fragile".to_string()),
            driver_id: None,
            vehicle_id: None,
            cargo: Vec::new(),
        }
    }

    #[test]
    fn update_allows_past_pickup_but_not_future_actuals() {
        let errors = update_request().validate_at(now()).unwrap_err();
        assert!(errors.field("scheduledPickupDate").is_none());
        assert!(errors.field("actualPickupDate").is_none());
        assert_eq!(
            errors.field("actualDeliveryDate").unwrap(),
            ["Actual delivery date cannot be in the future."]
        );
    }

    #[test]
    fn create_request_deserializes_from_camel_case() {
        let json = r#"{
            "originAddress": "Kyiv",
            "destinationAddress": "Lviv",
            "scheduledPickupDate": "2026-03-02T08:00:00Z",
            "status": "Delivered",
            "totalWeightKg": 500,
            "totalVolumeM3": 3,
            "price": 2500.00,
            "cargo": [{"name": "Parts", "weightKg": 10, "volumeM3": 0.5, "quantity": 1}]
        }"#;
        let request: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.price, dec!(2500));
        assert_eq!(request.status, Some(OrderStatus::Delivered));
        assert_eq!(request.cargo.len(), 1);
        assert!(request.cargo[0].id.is_none());
    }

    fn driver_request() -> CreateDriverRequest {
        CreateDriverRequest {
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            license_number: "DRV001".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 5, 10).unwrap(),
            user_id: UserId::new(),
        }
    }

    #[test]
    fn valid_driver_request_passes() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(driver_request().validate_on(today).is_ok());
    }

    #[test]
    fn driver_age_and_license_rules() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut request = driver_request();
        request.license_number = "drv-1".to_string();
        request.date_of_birth = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        request.user_id = UserId::from_uuid(uuid::Uuid::nil());

        let errors = request.validate_on(today).unwrap_err();
        assert!(errors.field("licenseNumber").is_some());
        assert!(errors.field("dateOfBirth").is_some());
        assert!(errors.field("userId").is_some());
        assert!(errors.field("firstName").is_none());
    }

    #[test]
    fn update_driver_requires_names_and_id() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let request = UpdateDriverRequest {
            id: DriverId::from_uuid(uuid::Uuid::nil()),
            first_name: " ".to_string(),
            last_name: "x".repeat(51),
            license_number: "DRV001".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 5, 10).unwrap(),
            is_available: true,
            user_id: UserId::new(),
        };

        let errors = request.validate_on(today).unwrap_err();
        assert_eq!(errors.field("id").unwrap(), ["Driver ID is required."]);
        assert_eq!(errors.field("firstName").unwrap(), ["This field is required."]);
        assert_eq!(
            errors.field("lastName").unwrap(),
            ["Last name cannot exceed 50 characters."]
        );
        assert!(errors.field("licenseNumber").is_none());
    }

    #[test]
    fn driver_older_than_ninety_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut request = driver_request();
        request.date_of_birth = NaiveDate::from_ymd_opt(1930, 1, 1).unwrap();
        assert!(request.validate_on(today).is_err());
    }
}
