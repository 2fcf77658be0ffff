use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
    db::Store,
    error::ApiError,
    handlers::AppState,
    models::{User, UserRole},
};

// Set by the gateway after the identity provider has verified the session.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub async fn resolve(store: &Store, headers: &HeaderMap) -> Result<Self, ApiError> {
        let id = headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(ApiError::Unauthorized)?;
        match store.get::<User>(id).await? {
            Some(user) => Ok(AuthContext { user }),
            None => {
                warn!("rejected request for unknown user {}", id);
                Err(ApiError::Unauthorized)
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        AuthContext::resolve(&state.store, &parts.headers).await
    }
}

/// An authenticated caller whose stored role is admin.
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

impl TryFrom<AuthContext> for AdminContext {
    type Error = ApiError;

    fn try_from(auth: AuthContext) -> Result<Self, Self::Error> {
        if auth.is_admin() {
            Ok(AdminContext(auth))
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        AuthContext::from_request_parts(parts, state).await?.try_into()
    }
}
