use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    state::AppState,
};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

/// Who is calling. Handlers pass it to the services, which decide what the
/// caller may see or change.
#[derive(Debug, Clone, Default)]
pub enum AuthContext {
    #[default]
    Anonymous,
    Admin(AuthUser),
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::Admin(_))
    }

    pub fn require_admin(&self) -> AppResult<&AuthUser> {
        match self {
            AuthContext::Admin(user) => Ok(user),
            AuthContext::Anonymous => Err(AppError::Forbidden),
        }
    }

    /// Acting user for audit entries.
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::Admin(user) => Some(user.user_id),
            AuthContext::Anonymous => None,
        }
    }
}

pub fn issue_token(user_id: Uuid, role: &str, secret: &str, ttl: Duration) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Resolve an `Authorization` header value to a context. Anything that is not
/// a valid admin bearer token is anonymous.
pub fn resolve_context(auth_header: Option<&str>, secret: &str) -> AuthContext {
    let Some(token) = auth_header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return AuthContext::Anonymous;
    };

    let decoded = match decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::debug!(error = %err, "rejected bearer token");
            return AuthContext::Anonymous;
        }
    };

    let Ok(user_id) = Uuid::parse_str(&decoded.claims.sub) else {
        return AuthContext::Anonymous;
    };

    if decoded.claims.role == ADMIN_ROLE {
        AuthContext::Admin(AuthUser {
            user_id,
            role: decoded.claims.role,
        })
    } else {
        AuthContext::Anonymous
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        Ok(resolve_context(auth_header, &state.jwt_secret))
    }
}
