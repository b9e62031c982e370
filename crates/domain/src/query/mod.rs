//! Filtering, sorting and pagination for list endpoints.
//!
//! A [`QueryDescriptor`] pairs an entity-specific filter with the generic
//! sort and page parameters. [`QueryDescriptor::execute`] always filters
//! first, then sorts, then takes the requested page; pagination never
//! reorders.
//!
//! Sorting rules:
//! - no `sort_by` sorts by id ascending;
//! - an unrecognised `sort_by` falls back to the entity's default field;
//! - ties on the sort field are broken by id ascending.

mod driver;
mod order;

pub use driver::{DriverFilter, DriverRecord, DriverSortField};
pub use order::{OrderFilter, OrderSortField};

use std::cmp::Ordering;

use common::Page;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationErrors;

/// Sort direction. Anything other than `desc` (any case) means ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        SortOrder::parse(&value)
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => "asc".to_string(),
            SortOrder::Desc => "desc".to_string(),
        }
    }
}

/// Which page of the sorted result to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Validates `page_number >= 1` and `1 <= page_size <= 100`.
    pub fn new(page_number: u32, page_size: u32) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if page_number < 1 {
            errors.add("pageNumber", "PageNumber must be at least 1.");
        }
        if !(1..=Self::MAX_PAGE_SIZE).contains(&page_size) {
            errors.add(
                "pageSize",
                format!("PageSize must be between 1 and {}.", Self::MAX_PAGE_SIZE),
            );
        }
        errors.into_result()?;
        Ok(Self {
            page_number,
            page_size,
        })
    }

    /// Builds a request from optional parameters, applying the defaults.
    pub fn from_optional(
        page_number: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Self, ValidationErrors> {
        Self::new(
            page_number.unwrap_or(1),
            page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE),
        )
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page_number as usize - 1) * self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Entity-specific half of a list query.
pub trait QuerySpec {
    /// The (eager-loaded) item the query runs over.
    type Item;

    /// Allow-listed sort fields.
    type SortField: Copy + std::fmt::Debug + PartialEq;

    /// Field used when `sort_by` names nothing on the allow-list.
    const DEFAULT_SORT: Self::SortField;

    /// Parses a sort field name, ignoring case.
    fn parse_sort_field(name: &str) -> Option<Self::SortField>;

    /// Returns true if `item` satisfies every supplied filter.
    fn matches(&self, item: &Self::Item) -> bool;

    /// Compares two items on one field, ascending.
    fn compare(field: Self::SortField, a: &Self::Item, b: &Self::Item) -> Ordering;

    /// Stable identity used as the final tiebreaker.
    fn id_of(item: &Self::Item) -> Uuid;
}

/// Resolved sort key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortKey<F> {
    Id,
    Field(F),
}

/// Filter, sort and page parameters for one list call.
#[derive(Debug, Clone, Default)]
pub struct QueryDescriptor<F> {
    pub filter: F,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

impl<F: QuerySpec> QueryDescriptor<F> {
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            sort_by: None,
            sort_order: SortOrder::Asc,
            page: PageRequest::default(),
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = order;
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Resolves `sort_by` against the allow-list.
    pub fn sort_key(&self) -> SortKey<F::SortField> {
        match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => SortKey::Id,
            Some(name) => SortKey::Field(F::parse_sort_field(name).unwrap_or(F::DEFAULT_SORT)),
        }
    }

    /// Runs the query over a base collection.
    pub fn execute(&self, items: impl IntoIterator<Item = F::Item>) -> Page<F::Item> {
        let mut matching: Vec<F::Item> = items
            .into_iter()
            .filter(|item| self.filter.matches(item))
            .collect();

        match self.sort_key() {
            SortKey::Id => matching.sort_by_key(|item| F::id_of(item)),
            SortKey::Field(field) => matching.sort_by(|a, b| {
                self.sort_order
                    .apply(F::compare(field, a, b))
                    .then_with(|| F::id_of(a).cmp(&F::id_of(b)))
            }),
        }

        let total_count = matching.len();
        let items = matching
            .into_iter()
            .skip(self.page.offset())
            .take(self.page.page_size() as usize)
            .collect();

        Page {
            items,
            page_number: self.page.page_number(),
            page_size: self.page.page_size(),
            total_count,
        }
    }
}

/// Case-insensitive substring match. A blank needle matches everything.
pub(crate) fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Case-insensitive ordering of two strings.
pub(crate) fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
