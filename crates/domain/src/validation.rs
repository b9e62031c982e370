//! Field-level input validation.
//!
//! Static field rules are declared on request types with
//! `#[derive(validator::Validate)]`; the checks that need a clock or compare
//! two fields are written by hand. Both end up in [`ValidationErrors`], keyed
//! by JSON (camelCase) field name, so the caller sees all problems at once.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use validator::{ValidationError, ValidationErrorsKind};

use crate::order::{PRICE_INTEGER_DIGITS, PRICE_SCALE};

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Runs the declared field rules of `value`.
    pub fn of(value: &impl validator::Validate) -> Self {
        match validator::Validate::validate(value) {
            Ok(()) => Self::new(),
            Err(errors) => errors.into(),
        }
    }

    /// Returns `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &validator::ValidationErrors) {
        for (field, kind) in errors.errors() {
            let field: &str = field.as_ref();
            let name = camel_case(field);
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{name}"),
                None => name,
            };
            match kind {
                ValidationErrorsKind::Field(failures) => {
                    for error in failures {
                        let message = error
                            .message
                            .as_deref()
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("{path} is invalid ({}).", error.code));
                        self.add(path.clone(), message);
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect(Some(&path), inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.collect(Some(&format!("{path}[{index}]")), inner);
                    }
                }
            }
        }
    }
}

/// Flattens nested and list errors into `cargo[1].weightKg` style keys.
impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut flat = Self::new();
        flat.collect(None, &errors);
        flat
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn failure(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Rejects empty and whitespace-only strings.
pub fn required_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(failure("required", "This field is required."));
    }
    Ok(())
}

/// License numbers are 5 to 15 upper-case ASCII letters or digits.
pub fn license_number(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(failure("required", "License number is required."));
    }
    let well_formed = (5..=15).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !well_formed {
        return Err(failure(
            "license_format",
            "License number must be alphanumeric and 5-15 characters long.",
        ));
    }
    Ok(())
}

/// Prices must be positive and fit the stored precision exactly.
pub fn price(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(failure("range", "Price must be greater than 0."));
    }
    if value.normalize().scale() > PRICE_SCALE {
        return Err(failure(
            "scale",
            format!("Price cannot have more than {PRICE_SCALE} decimal places."),
        ));
    }
    if *value >= Decimal::from(10_i64.pow(PRICE_INTEGER_DIGITS)) {
        return Err(failure(
            "range",
            format!("Price cannot have more than {PRICE_INTEGER_DIGITS} integer digits."),
        ));
    }
    Ok(())
}

/// Full years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Line {
        #[validate(custom(function = "required_text"))]
        item_name: String,
        #[validate(range(min = 1, message = "Quantity must be at least 1."))]
        quantity: i32,
    }

    #[derive(Validate)]
    struct Sheet {
        #[validate(length(max = 5, message = "Too long."))]
        title: String,
        #[validate(nested)]
        lines: Vec<Line>,
    }

    fn line(name: &str, quantity: i32) -> Line {
        Line {
            item_name: name.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let sheet = Sheet {
            title: "ok".to_string(),
            lines: vec![line("bolt", 1)],
        };
        assert!(ValidationErrors::of(&sheet).is_empty());
    }

    #[test]
    fn test_declared_rules_are_flattened_to_camel_case() {
        let sheet = Sheet {
            title: "far too long".to_string(),
            lines: vec![line("bolt", 1), line("  ", 0)],
        };

        let errors = ValidationErrors::of(&sheet);

        assert_eq!(errors.field("title").unwrap(), ["Too long."]);
        assert_eq!(
            errors.field("lines[1].itemName").unwrap(),
            ["This field is required."]
        );
        assert_eq!(
            errors.field("lines[1].quantity").unwrap(),
            ["Quantity must be at least 1."]
        );
        assert!(errors.field("lines[0].itemName").is_none());
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("a", "first");
        errors.add("b", "second");
        assert_eq!(errors.to_string(), "a: first; b: second");
    }

    #[test]
    fn test_age_on() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2018, 6, 14).unwrap()), 17);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2018, 6, 15).unwrap()), 18);
    }

    #[test]
    fn test_license_number_format() {
        assert!(license_number("DRV001").is_ok());
        assert!(license_number("AB123").is_ok());
        assert!(license_number("AB12").is_err());
        assert!(license_number("drv001").is_err());
        assert!(license_number("DRV-001").is_err());
        assert!(license_number("ABCDEFGHIJ123456").is_err());
        assert_eq!(license_number(" ").unwrap_err().code, "required");
    }

    #[test]
    fn test_price_must_fit_stored_precision() {
        assert!(price(&dec!(10.01)).is_ok());
        assert!(price(&dec!(10.010)).is_ok());
        assert!(price(&dec!(9999999999999999.99)).is_ok());

        assert_eq!(price(&dec!(0)).unwrap_err().code, "range");
        assert_eq!(price(&dec!(10.005)).unwrap_err().code, "scale");
        assert_eq!(price(&dec!(10000000000000000)).unwrap_err().code, "range");
    }
}
