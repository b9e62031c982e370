//! Identity provider trait and in-memory implementation.
//!
//! Users, roles and bearer tokens live outside the logistics tables. Drivers
//! only hold the id of the user account they belong to.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// How long an access token stays valid.
pub const ACCESS_TOKEN_LIFETIME_MINUTES: i64 = 15;
/// How long a refresh token stays valid.
pub const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 7;

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_USER: &str = "User";
pub const ROLE_DRIVER: &str = "Driver";

/// Errors raised by the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// The provider could not complete the request.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

/// Data for a new user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl NewUser {
    /// A user whose user name is their email, as the seeded accounts are.
    pub fn with_email(email: &str, first_name: &str, last_name: &str, role: &str) -> Self {
        Self {
            user_name: email.to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            roles: vec![role.to_string()],
        }
    }
}

/// An access token and the refresh token that can replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// What a valid access token says about its bearer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: UserId,
    pub email: String,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Trait for user account and token operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, IdentityError>;

    /// Looks a user up by email, ignoring case.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, IdentityError>;

    async fn create_user(&self, user: NewUser) -> Result<User, IdentityError>;

    async fn get_roles(&self, id: UserId) -> Result<Vec<String>, IdentityError>;

    /// Removes a user and revokes their tokens.
    ///
    /// Returns the removed record so the caller can restore it.
    async fn delete_user(&self, id: UserId) -> Result<User, IdentityError>;

    /// Puts back a user previously returned by [`IdentityProvider::delete_user`].
    async fn restore_user(&self, user: User) -> Result<(), IdentityError>;

    /// Issues a fresh token pair, replacing any refresh token the user had.
    async fn issue_tokens(&self, id: UserId) -> Result<TokenPair, IdentityError>;

    async fn validate_access_token(&self, token: &str) -> Result<Claims, IdentityError>;

    /// Exchanges a (possibly expired) access token and its refresh token for
    /// a new pair. The old refresh token stops working.
    async fn refresh_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, IdentityError>;
}

#[derive(Debug)]
struct InMemoryIdentityState {
    users: HashMap<UserId, User>,
    access_tokens: HashMap<String, (UserId, DateTime<Utc>)>,
    refresh_tokens: HashMap<UserId, (String, DateTime<Utc>)>,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
    fail_on_delete: bool,
}

impl Default for InMemoryIdentityState {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            access_lifetime: Duration::minutes(ACCESS_TOKEN_LIFETIME_MINUTES),
            refresh_lifetime: Duration::days(REFRESH_TOKEN_LIFETIME_DAYS),
            fail_on_delete: false,
        }
    }
}

impl InMemoryIdentityState {
    fn issue(&mut self, user_id: UserId) -> TokenPair {
        let now = Utc::now();
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        let access_token_expires_at = now + self.access_lifetime;
        let refresh_token_expires_at = now + self.refresh_lifetime;

        self.access_tokens
            .insert(access_token.clone(), (user_id, access_token_expires_at));
        self.refresh_tokens
            .insert(user_id, (refresh_token.clone(), refresh_token_expires_at));

        TokenPair {
            access_token,
            access_token_expires_at,
            refresh_token,
            refresh_token_expires_at,
        }
    }

    fn revoke(&mut self, user_id: UserId) {
        self.access_tokens.retain(|_, (owner, _)| *owner != user_id);
        self.refresh_tokens.remove(&user_id);
    }

    fn email_taken(&self, email: &str) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
    }
}

/// In-memory identity provider with opaque bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityProvider {
    /// Creates a new in-memory identity provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider with custom token lifetimes.
    pub fn with_lifetimes(access: Duration, refresh: Duration) -> Self {
        let provider = Self::default();
        {
            let mut state = provider.write();
            state.access_lifetime = access;
            state.refresh_lifetime = refresh;
        }
        provider
    }

    /// Configures the service to fail on the next delete call.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.write().fail_on_delete = fail;
    }

    /// Returns the number of user accounts.
    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryIdentityState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryIdentityState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, IdentityError> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, IdentityError> {
        let mut state = self.write();
        if state.email_taken(&user.email) {
            return Err(IdentityError::DuplicateEmail(user.email));
        }

        let created = User {
            id: UserId::new(),
            user_name: user.user_name,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            roles: user.roles,
        };
        state.users.insert(created.id, created.clone());
        tracing::info!(user_id = %created.id, "User created");
        Ok(created)
    }

    async fn get_roles(&self, id: UserId) -> Result<Vec<String>, IdentityError> {
        self.read()
            .users
            .get(&id)
            .map(|u| u.roles.clone())
            .ok_or(IdentityError::UserNotFound(id))
    }

    async fn delete_user(&self, id: UserId) -> Result<User, IdentityError> {
        let mut state = self.write();
        if state.fail_on_delete {
            return Err(IdentityError::Unavailable(
                "User store rejected the delete".to_string(),
            ));
        }

        let removed = state
            .users
            .remove(&id)
            .ok_or(IdentityError::UserNotFound(id))?;
        state.revoke(id);
        tracing::info!(user_id = %id, "User deleted");
        Ok(removed)
    }

    async fn restore_user(&self, user: User) -> Result<(), IdentityError> {
        let mut state = self.write();
        if state.email_taken(&user.email) {
            return Err(IdentityError::DuplicateEmail(user.email));
        }
        tracing::info!(user_id = %user.id, "User restored");
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn issue_tokens(&self, id: UserId) -> Result<TokenPair, IdentityError> {
        let mut state = self.write();
        if !state.users.contains_key(&id) {
            return Err(IdentityError::UserNotFound(id));
        }
        Ok(state.issue(id))
    }

    async fn validate_access_token(&self, token: &str) -> Result<Claims, IdentityError> {
        let state = self.read();
        let (user_id, expires_at) = state
            .access_tokens
            .get(token)
            .copied()
            .ok_or(IdentityError::InvalidToken)?;
        if expires_at <= Utc::now() {
            return Err(IdentityError::TokenExpired);
        }
        let user = state
            .users
            .get(&user_id)
            .ok_or(IdentityError::InvalidToken)?;

        Ok(Claims {
            subject: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            expires_at,
        })
    }

    async fn refresh_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, IdentityError> {
        let mut state = self.write();
        let (user_id, _) = state
            .access_tokens
            .get(access_token)
            .copied()
            .ok_or(IdentityError::InvalidToken)?;

        let (stored, expires_at) = state
            .refresh_tokens
            .get(&user_id)
            .cloned()
            .ok_or(IdentityError::InvalidToken)?;
        if stored != refresh_token {
            return Err(IdentityError::InvalidToken);
        }
        if expires_at <= Utc::now() {
            return Err(IdentityError::TokenExpired);
        }

        state.access_tokens.remove(access_token);
        Ok(state.issue(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_user() -> NewUser {
        NewUser::with_email("driver@example.com", "Olena", "Sydorenko", ROLE_DRIVER)
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user(driver_user()).await.unwrap();

        let by_id = provider.find_user_by_id(user.id).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&user));

        let by_email = provider
            .find_user_by_email("DRIVER@example.com")
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        assert_eq!(provider.get_roles(user.id).await.unwrap(), vec!["Driver"]);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let provider = InMemoryIdentityProvider::new();
        provider.create_user(driver_user()).await.unwrap();
        let result = provider.create_user(driver_user()).await;
        assert!(matches!(result, Err(IdentityError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_token_validation() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user(driver_user()).await.unwrap();
        let tokens = provider.issue_tokens(user.id).await.unwrap();

        let claims = provider
            .validate_access_token(&tokens.access_token)
            .await
            .unwrap();
        assert_eq!(claims.subject, user.id);
        assert_eq!(claims.email, "driver@example.com");
        assert_eq!(claims.roles, vec!["Driver"]);

        assert_eq!(
            provider.validate_access_token("bogus").await,
            Err(IdentityError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let provider = InMemoryIdentityProvider::with_lifetimes(Duration::zero(), Duration::days(1));
        let user = provider.create_user(driver_user()).await.unwrap();
        let tokens = provider.issue_tokens(user.id).await.unwrap();

        assert_eq!(
            provider.validate_access_token(&tokens.access_token).await,
            Err(IdentityError::TokenExpired)
        );

        // An expired access token can still be refreshed
        let refreshed = provider
            .refresh_tokens(&tokens.access_token, &tokens.refresh_token)
            .await
            .unwrap();
        assert_ne!(refreshed.refresh_token, tokens.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user(driver_user()).await.unwrap();
        let first = provider.issue_tokens(user.id).await.unwrap();

        let second = provider
            .refresh_tokens(&first.access_token, &first.refresh_token)
            .await
            .unwrap();
        assert!(provider.validate_access_token(&second.access_token).await.is_ok());
        assert_eq!(
            provider.validate_access_token(&first.access_token).await,
            Err(IdentityError::InvalidToken)
        );

        // The old refresh token was rotated away
        let replay = provider
            .refresh_tokens(&second.access_token, &first.refresh_token)
            .await;
        assert_eq!(replay, Err(IdentityError::InvalidToken));
    }

    #[tokio::test]
    async fn test_delete_and_restore() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user(driver_user()).await.unwrap();
        let tokens = provider.issue_tokens(user.id).await.unwrap();

        let removed = provider.delete_user(user.id).await.unwrap();
        assert_eq!(provider.user_count(), 0);
        assert!(provider.validate_access_token(&tokens.access_token).await.is_err());

        provider.restore_user(removed).await.unwrap();
        assert_eq!(provider.find_user_by_id(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_fail_on_delete() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user(driver_user()).await.unwrap();
        provider.set_fail_on_delete(true);

        let result = provider.delete_user(user.id).await;
        assert!(matches!(result, Err(IdentityError::Unavailable(_))));
        assert_eq!(provider.user_count(), 1);
    }
}
