use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Caller identity taken from a valid bearer token.
///
/// Adding this extractor to a handler makes the route require a token;
/// the handler never runs without one.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.id }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers).map_err(|reason| {
            tracing::debug!("No bearer token: {}", reason);
            ApiError::token_missing()
        })?;

        let claims = validate_jwt(&token, &state.security).map_err(|reason| {
            tracing::warn!("Rejected bearer token: {}", reason);
            ApiError::token_invalid()
        })?;

        Ok(AuthUser::from(claims))
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Authorization header is not valid text")?;

    let Some(token) = auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("bearer "))
    else {
        return Err("Authorization header must use Bearer token format");
    };

    let token = token.trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(extract_jwt_from_headers(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn other_schemes_and_blank_tokens_count_as_missing() {
        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
        assert!(extract_jwt_from_headers(&headers("Basic dXNlcjpwdw==")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer   ")).is_err());
    }
}
