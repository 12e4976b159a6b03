use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use merx_core::{AuthContext, Role};

use crate::error::ApiError;
use crate::state::{AppState, AuthConfig};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Bearer JWT check for every /v1 route. A valid token of either role gets
/// through; per-route role checks happen in the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let role = Role::parse(&token_data.claims.role).ok_or(StatusCode::FORBIDDEN)?;

    req.extensions_mut().insert(AuthContext {
        customer_id: token_data.claims.sub,
        role,
    });

    Ok(next.run(req).await)
}

pub fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("admin role required".to_string()))
    }
}

/// Mint a token for the given subject and role, valid for the configured
/// expiration window.
pub fn issue_token(
    auth: &AuthConfig,
    sub: &str,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let role = match role {
        Role::Customer => "CUSTOMER",
        Role::Admin => "ADMIN",
    };
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() as usize) + auth.expiration as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_carry_the_configured_expiration() {
        let auth = AuthConfig { secret: "s3cret".to_string(), expiration: 120 };
        let token = issue_token(&auth, "cust-9", Role::Customer).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(auth.secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, "cust-9");
        assert_eq!(data.claims.role, "CUSTOMER");
        let now = chrono::Utc::now().timestamp() as usize;
        assert!(data.claims.exp >= now + 110 && data.claims.exp <= now + 130);
    }
}
