//! Order CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use chrono::NaiveDate;
use common::{OrderId, Page};
use domain::{OrderFilter, OrderStatus, PageRequest, QueryDescriptor, SortOrder};
use rust_decimal::Decimal;
use serde::Deserialize;
use services::{CreateOrderRequest, IdentityProvider, OrderView, UpdateOrderRequest};
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

/// Query string of `GET /orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub origin_address: Option<String>,
    pub destination_address: Option<String>,
    pub status: Option<String>,
    pub creation_date_from: Option<NaiveDate>,
    pub creation_date_to: Option<NaiveDate>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl OrderListParams {
    fn into_query(self) -> Result<QueryDescriptor<OrderFilter>, ApiError> {
        let status = self
            .status
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<OrderStatus>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(QueryDescriptor {
            filter: OrderFilter {
                origin_address: self.origin_address,
                destination_address: self.destination_address,
                status,
                creation_date_from: self.creation_date_from,
                creation_date_to: self.creation_date_to,
                min_price: self.min_price,
                max_price: self.max_price,
            },
            sort_by: self.sort_by,
            sort_order: self
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
            page: PageRequest::from_optional(self.page_number, self.page_size)?,
        })
    }
}

/// GET /orders: filtered, sorted, paged order list.
#[tracing::instrument(skip(state))]
pub async fn list<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    params: Result<Query<OrderListParams>, QueryRejection>,
) -> Result<Json<Page<OrderView>>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let Query(params) = params?;
    let query = params.into_query()?;
    Ok(Json(state.orders.list_orders(&query).await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.get_order(id).await?))
}

/// POST /orders: create a pending order with its cargo.
#[tracing::instrument(skip(state, body))]
pub async fn create<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<OrderView>), ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let Json(request) = body?;
    let order = state.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, location(order.id), Json(order)))
}

/// PUT /orders/{id}: full update with cargo reconciliation.
#[tracing::instrument(skip(state, body))]
pub async fn update<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderView>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let id: OrderId = parse_id(&id)?;
    let Json(request) = body?;
    Ok(Json(state.orders.update_order(id, request).await?))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let id: OrderId = parse_id(&id)?;
    if state.orders.delete_order(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Order with ID {id} not found.")))
    }
}

fn location(id: OrderId) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("/orders/{id}")) {
        headers.insert(LOCATION, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_build_query() {
        let params = OrderListParams {
            status: Some("intransit".to_string()),
            min_price: Some(Decimal::from(100)),
            sort_by: Some("price".to_string()),
            sort_order: Some("DESC".to_string()),
            page_number: Some(2),
            page_size: Some(5),
            ..Default::default()
        };

        let query = params.into_query().unwrap();
        assert_eq!(query.filter.status, Some(OrderStatus::InTransit));
        assert_eq!(query.filter.min_price, Some(Decimal::from(100)));
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.page.page_number(), 2);
        assert_eq!(query.page.offset(), 5);
    }

    #[test]
    fn test_unknown_status_is_bad_request() {
        let params = OrderListParams {
            status: Some("Shipped".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_page_size_over_limit_is_validation_error() {
        let params = OrderListParams {
            page_size: Some(101),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::Validation(_))));
    }
}
