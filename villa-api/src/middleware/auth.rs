use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use villa_core::models::Role;

use crate::error::AppError;
use crate::state::AppState;

/// Cookie the web client stores the session token in.
pub const TOKEN_COOKIE: &str = "token";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// The caller behind a valid session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn decode(token: &str, secret: &str) -> Result<Self, AppError> {
        let token_data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!(error = %e, "Rejected session token");
            AppError::AuthenticationError("Invalid or expired session".to_string())
        })?;

        let claims = token_data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthenticationError("Invalid session subject".to_string()))?;

        Ok(Self { user_id, email: claims.email, role: claims.role })
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by a role middleware.
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let token = match bearer {
            Some(token) => token,
            None => CookieJar::from_headers(&parts.headers)
                .get(TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .ok_or_else(|| AppError::AuthenticationError("Authentication required".to_string()))?,
        };

        let session = Self::decode(&token, &state.auth.secret)?;
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

// ============================================================================
// Role Middleware
// ============================================================================

async fn require_role(role: Role, session: Session, mut req: Request, next: Next) -> Result<Response, AppError> {
    if session.role != role {
        warn!(user_id = %session.user_id, have = %session.role, need = %role, "Role check failed");
        return Err(AppError::AuthorizationError("Access denied".to_string()));
    }

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

pub async fn admin_only(session: Session, req: Request, next: Next) -> Result<Response, AppError> {
    require_role(Role::Admin, session, req, next).await
}

pub async fn owner_only(session: Session, req: Request, next: Next) -> Result<Response, AppError> {
    require_role(Role::VillaOwner, session, req, next).await
}
