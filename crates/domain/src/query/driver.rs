//! Driver listing filters and sort fields.

use std::cmp::Ordering;

use uuid::Uuid;

use super::{QuerySpec, cmp_text, contains_ignore_case};
use crate::driver::{Driver, LinkedUser};

/// A driver joined with its user account, the unit driver listings run over.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverRecord {
    pub driver: Driver,
    pub user: Option<LinkedUser>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub license_number: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSortField {
    FirstName,
    LastName,
    LicenseNumber,
    DateOfBirth,
    IsAvailable,
    UserName,
    Email,
}

impl QuerySpec for DriverFilter {
    type Item = DriverRecord;
    type SortField = DriverSortField;

    const DEFAULT_SORT: DriverSortField = DriverSortField::FirstName;

    fn parse_sort_field(name: &str) -> Option<DriverSortField> {
        let field = match name.to_ascii_lowercase().as_str() {
            "firstname" => DriverSortField::FirstName,
            "lastname" => DriverSortField::LastName,
            "licensenumber" => DriverSortField::LicenseNumber,
            "dateofbirth" => DriverSortField::DateOfBirth,
            "isavailable" => DriverSortField::IsAvailable,
            "username" => DriverSortField::UserName,
            "email" => DriverSortField::Email,
            _ => return None,
        };
        Some(field)
    }

    fn matches(&self, item: &DriverRecord) -> bool {
        let driver = &item.driver;
        contains_ignore_case(&driver.first_name, self.first_name.as_deref())
            && contains_ignore_case(&driver.last_name, self.last_name.as_deref())
            && contains_ignore_case(&driver.license_number, self.license_number.as_deref())
            && self.is_available.is_none_or(|wanted| driver.is_available == wanted)
    }

    fn compare(field: DriverSortField, a: &DriverRecord, b: &DriverRecord) -> Ordering {
        let (x, y) = (&a.driver, &b.driver);
        match field {
            DriverSortField::FirstName => cmp_text(&x.first_name, &y.first_name),
            DriverSortField::LastName => cmp_text(&x.last_name, &y.last_name),
            DriverSortField::LicenseNumber => cmp_text(&x.license_number, &y.license_number),
            DriverSortField::DateOfBirth => x.date_of_birth.cmp(&y.date_of_birth),
            DriverSortField::IsAvailable => x.is_available.cmp(&y.is_available),
            DriverSortField::UserName => cmp_user(a, b, |u| &u.user_name),
            DriverSortField::Email => cmp_user(a, b, |u| &u.email),
        }
    }

    fn id_of(item: &DriverRecord) -> Uuid {
        item.driver.id.as_uuid()
    }
}

fn cmp_user(a: &DriverRecord, b: &DriverRecord, key: fn(&LinkedUser) -> &String) -> Ordering {
    match (a.user.as_ref(), b.user.as_ref()) {
        (Some(ua), Some(ub)) => cmp_text(key(ua), key(ub)),
        (ua, ub) => ua.is_some().cmp(&ub.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use common::{DriverId, UserId};

    use super::*;
    use crate::query::{PageRequest, QueryDescriptor, SortOrder};

    fn record(first: &str, last: &str, license: &str, available: bool) -> DriverRecord {
        let user_id = UserId::new();
        DriverRecord {
            driver: Driver {
                id: DriverId::new(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                license_number: license.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1980, 6, 15).unwrap(),
                is_available: available,
                user_id,
            },
            user: Some(LinkedUser {
                id: user_id,
                user_name: format!("{}.{}", first.to_lowercase(), last.to_lowercase()),
                email: format!("{}@example.com", first.to_lowercase()),
            }),
        }
    }

    #[test]
    fn test_license_prefix_sorted_by_last_name_desc() {
        let drivers = vec![
            record("Ivan", "Bondarenko", "DRV001", true),
            record("Olena", "Shevchenko", "DRV002", true),
            record("Taras", "Melnyk", "DRV003", false),
            record("Oksana", "Zinchenko", "XYZ999", true),
        ];
        let query = QueryDescriptor::new(DriverFilter {
            license_number: Some("DRV0".to_string()),
            ..Default::default()
        })
        .sort_by("lastname", SortOrder::Desc)
        .page(PageRequest::new(1, 1).unwrap());

        let page = query.execute(drivers);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].driver.last_name, "Shevchenko");
    }

    #[test]
    fn test_availability_filter() {
        let filter = DriverFilter {
            is_available: Some(false),
            ..Default::default()
        };
        assert!(filter.matches(&record("A", "B", "AAAAA1", false)));
        assert!(!filter.matches(&record("A", "B", "AAAAA1", true)));
    }

    #[test]
    fn test_name_filters_ignore_case() {
        let filter = DriverFilter {
            first_name: Some("OLE".to_string()),
            last_name: Some("chenko".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&record("Olena", "Shevchenko", "DRV002", true)));
        assert!(!filter.matches(&record("Olena", "Melnyk", "DRV002", true)));
    }

    #[test]
    fn test_default_sort_is_first_name() {
        let page = QueryDescriptor::new(DriverFilter::default())
            .sort_by("shoeSize", SortOrder::Asc)
            .execute(vec![
                record("Yurii", "A", "AAAAA1", true),
                record("Bohdan", "B", "AAAAA2", true),
            ]);
        assert_eq!(page.items[0].driver.first_name, "Bohdan");
    }

    #[test]
    fn test_sort_by_email_puts_unlinked_first() {
        let mut orphan = record("Zenon", "Orphan", "AAAAA3", true);
        orphan.user = None;
        let page = QueryDescriptor::new(DriverFilter::default())
            .sort_by("Email", SortOrder::Asc)
            .execute(vec![
                record("Maria", "A", "AAAAA1", true),
                orphan,
                record("Anna", "B", "AAAAA2", true),
            ]);
        let names: Vec<&str> = page
            .items
            .iter()
            .map(|r| r.driver.first_name.as_str())
            .collect();
        assert_eq!(names, vec!["Zenon", "Anna", "Maria"]);
    }
}
