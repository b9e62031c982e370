//! Bearer token guard, user registration and token refresh endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use domain::ValidationErrors;
use domain::validation::required_text;
use serde::Deserialize;
use services::identity::{ROLE_DRIVER, ROLE_USER};
use services::{IdentityProvider, NewUser, TokenPair, User};
use store::Store;
use validator::{Validate, ValidationError};

use super::AppState;
use crate::error::ApiError;

/// Requires `Authorization: Bearer <access token>` and stores the token's
/// claims in the request extensions.
pub async fn require_bearer<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state.identity.validate_access_token(token).await?;
    tracing::debug!(user_id = %claims.subject, "request authenticated");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Body of `POST /auth/register`. Accounts are created without a password;
/// tokens are issued by the identity provider.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(custom(function = "required_text"))]
    pub user_name: String,
    #[validate(email(message = "Email must be a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Admin accounts are never created here.
    #[serde(default = "default_role")]
    #[validate(custom(function = "self_service_role"))]
    pub role: String,
}

fn default_role() -> String {
    ROLE_USER.to_string()
}

fn self_service_role(role: &str) -> Result<(), ValidationError> {
    if role == ROLE_USER || role == ROLE_DRIVER {
        return Ok(());
    }
    Err(ValidationError::new("role")
        .with_message(format!("Role must be {ROLE_USER} or {ROLE_DRIVER}.").into()))
}

impl From<RegisterRequest> for NewUser {
    fn from(request: RegisterRequest) -> Self {
        Self {
            user_name: request.user_name.trim().to_string(),
            email: request.email.trim().to_string(),
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            roles: vec![request.role],
        }
    }
}

/// POST /auth/register: creates a user account that drivers can be linked to.
#[tracing::instrument(skip_all)]
pub async fn register<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let Json(request) = body?;
    ValidationErrors::of(&request).into_result()?;

    let user = state.identity.create_user(request.into()).await?;
    metrics::counter!("users_registered_total").increment(1);
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /auth/refresh: exchanges a token pair for a new one.
#[tracing::instrument(skip_all)]
pub async fn refresh<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError>
where
    S: Store + Clone + 'static,
    I: IdentityProvider + 'static,
{
    let Json(request) = body?;
    let tokens = state
        .identity
        .refresh_tokens(&request.access_token, &request.refresh_token)
        .await?;
    metrics::counter!("token_refreshes_total").increment(1);
    Ok(Json(tokens))
}
