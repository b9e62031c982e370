//! Driver CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use common::{DriverId, Page};
use domain::{DriverFilter, PageRequest, QueryDescriptor, SortOrder};
use serde::Deserialize;
use services::{CreateDriverRequest, DriverView, IdentityProvider, UpdateDriverRequest};
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

/// Query string of `GET /drivers`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverListParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub license_number: Option<String>,
    pub is_available: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl DriverListParams {
    fn into_query(self) -> Result<QueryDescriptor<DriverFilter>, ApiError> {
        Ok(QueryDescriptor {
            filter: DriverFilter {
                first_name: self.first_name,
                last_name: self.last_name,
                license_number: self.license_number,
                is_available: self.is_available,
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

#[tracing::instrument(skip(state))]
pub async fn list<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    params: Result<Query<DriverListParams>, QueryRejection>,
) -> Result<Json<Page<DriverView>>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let Query(params) = params?;
    let query = params.into_query()?;
    Ok(Json(state.drivers.list_drivers(&query).await?))
}

#[tracing::instrument(skip(state))]
pub async fn get<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
) -> Result<Json<DriverView>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let id: DriverId = parse_id(&id)?;
    Ok(Json(state.drivers.get_driver(id).await?))
}

/// POST /drivers: registers a driver for an existing user account.
#[tracing::instrument(skip(state, body))]
pub async fn create<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    body: Result<Json<CreateDriverRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<DriverView>), ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let Json(request) = body?;
    let driver = state.drivers.create_driver(request).await?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("/drivers/{}", driver.id)) {
        headers.insert(LOCATION, value);
    }
    Ok((StatusCode::CREATED, headers, Json(driver)))
}

#[tracing::instrument(skip(state, body))]
pub async fn update<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateDriverRequest>, JsonRejection>,
) -> Result<Json<DriverView>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let id: DriverId = parse_id(&id)?;
    let Json(request) = body?;
    Ok(Json(state.drivers.update_driver(id, request).await?))
}

/// DELETE /drivers/{id}: removes the driver and its user account.
#[tracing::instrument(skip(state))]
pub async fn delete<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let id: DriverId = parse_id(&id)?;
    state.drivers.delete_driver(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
