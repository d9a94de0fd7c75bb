use crate::api::AppState;
use crate::domain::auth::Claims;
use crate::domain::user::Principal;
use crate::error::{AppError, Result};
use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Request, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Verifies a bearer token and returns its claims.
///
/// # Errors
/// Returns `AppError::AuthError` on any malformed, expired, or forged token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map_err(|_| AppError::AuthError)?;

    Ok(token_data.claims)
}

/// The authenticated principal, extracted from the `Authorization` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub principal: Principal,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth_header = parts.headers.get(header::AUTHORIZATION).ok_or(AppError::AuthError)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::AuthError)?;
        let token = auth_str.strip_prefix("Bearer ").ok_or(AppError::AuthError)?;

        let claims = verify_token(token, &state.config.auth.jwt_secret)?;

        Ok(Self { principal: claims.principal() })
    }
}

/// Propagates an inbound `x-request-id` or mints a fresh UUID.
#[derive(Clone, Copy, Debug)]
pub struct MakeRequestUuidOrHeader;

impl MakeRequestId for MakeRequestUuidOrHeader {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        if let Some(id) = request.headers().get("x-request-id") {
            return Some(RequestId::new(id.clone()));
        }

        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}
