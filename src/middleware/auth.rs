use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, models::Role, state::AppState};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

pub fn ensure_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if !allowed.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, &[Role::Admin])
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    if user.role.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn ensure_management(user: &AuthUser) -> Result<(), AppError> {
    if user.role.is_management() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let role = decoded
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized("Invalid role in token".into()))?;

    Ok(AuthUser { user_id, role })
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;
    Ok(Some(token.trim()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
        let state = AppState::from_ref(state);
        decode_token(token, &state.config.jwt_secret)
    }
}

/// `Option<AuthUser>`: anonymous when no header is sent, rejected when a bad one is.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(None);
        };
        let state = AppState::from_ref(state);
        decode_token(token, &state.config.jwt_secret).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn staff_guard_rejects_customers_and_shippers() {
        assert!(ensure_staff(&user(Role::Employee)).is_ok());
        assert!(ensure_staff(&user(Role::Admin)).is_ok());
        assert!(matches!(
            ensure_staff(&user(Role::Customer)),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            ensure_staff(&user(Role::Shipper)),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn management_guard_excludes_employees() {
        assert!(ensure_management(&user(Role::Manager)).is_ok());
        assert!(ensure_management(&user(Role::Employee)).is_err());
        assert!(ensure_admin(&user(Role::Manager)).is_err());
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        let err = decode_token("not-a-jwt", "secret").expect_err("should reject");
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
