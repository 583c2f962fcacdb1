use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{Claims, Identity, TokenError};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from the bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id,
            username: claims.username,
        }
    }
}

impl From<&AuthUser> for Identity {
    fn from(user: &AuthUser) -> Self {
        Identity {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Validates the bearer token and injects `AuthUser` into request extensions
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = extract_jwt_from_headers(request.headers())
        .and_then(|token| state.tokens.validate(token))
        .map_err(|e| {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(TokenError::Missing)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(TokenError::Missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_or_wrong_scheme() {
        assert!(matches!(extract_jwt_from_headers(&HeaderMap::new()), Err(TokenError::Missing)));
        assert!(matches!(extract_jwt_from_headers(&headers("Basic dXNlcg==")), Err(TokenError::Missing)));
        assert!(matches!(extract_jwt_from_headers(&headers("Bearer   ")), Err(TokenError::Missing)));
    }
}
