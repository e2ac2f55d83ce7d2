// Authorization gate for privileged catalog access.
// Admin callers present a bearer JWT (HS256, shared secret) with role = "admin".

use axum::{
    RequestPartsExt, async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{AppState, config::Settings, error::AppError};

const ADMIN_ROLE: &str = "admin";

// --- Claims ---

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (User ID)
    pub exp: usize,  // Expiration time (seconds since epoch)
    pub role: Option<String>,
    pub email: Option<String>,
}

// --- Token Verification ---

pub fn verify_token(token: &str, settings: &Settings) -> Result<Claims, AppError> {
    let secret = settings.admin_jwt_secret.as_deref().ok_or_else(|| {
        error!("Admin JWT secret not configured in settings.");
        AppError::InternalServerError(anyhow::anyhow!("Missing admin JWT secret configuration"))
    })?;

    let validation = Validation::new(Algorithm::HS256);
    let decoded = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).map_err(|e| {
        warn!("Token validation failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".into()),
            _ => AppError::Unauthorized("Invalid token".into()),
        }
    })?;

    info!("Token successfully validated for user: {}", decoded.claims.sub);
    Ok(decoded.claims)
}

// --- Axum Extractor ---

// Present in a handler's arguments => the caller may see every listing status
#[derive(Clone, Debug)]
pub struct AdminUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                warn!("Failed to extract Authorization header: {}", e);
                AppError::Unauthorized("Missing or invalid Authorization header".into())
            })?;

        let app_state = AppState::from_ref(state);
        let claims = verify_token(bearer.token(), &app_state.settings)?;

        if claims.role.as_deref() != Some(ADMIN_ROLE) {
            warn!("User {} is not an admin", claims.sub);
            return Err(AppError::Unauthorized("Not authorized".into()));
        }

        Ok(AdminUser { user_id: claims.sub })
    }
}
