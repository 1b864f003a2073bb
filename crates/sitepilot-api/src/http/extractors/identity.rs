//! Caller identity from an API key.
//!
//! The key is read from `Authorization: Bearer <key>` or `X-API-Key: <key>`,
//! hashed, and looked up in the `api_keys` table. No header at all is a valid
//! anonymous request; a header with an unknown key is rejected.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::AppState;

/// Verified user id, or `None` for an anonymous caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub Option<String>);

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(key) = extract_api_key(&parts.headers)? else {
            return Ok(Identity(None));
        };
        match state.api_keys.resolve(&key).await? {
            Some(user_id) => Ok(Identity(Some(user_id))),
            None => Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            )),
        }
    }
}

/// The API key from the request headers, if one was sent.
fn extract_api_key(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    if let Some(auth) = headers.get("authorization") {
        let auth_str = auth
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".to_string()))?;
        return match auth_str.strip_prefix("Bearer ") {
            Some(key) if !key.trim().is_empty() => Ok(Some(key.trim().to_string())),
            _ => Err(AppError::Unauthorized(
                "Authorization header must use the Bearer scheme".to_string(),
            )),
        };
    }

    if let Some(key) = headers.get("x-api-key") {
        let key_str = key
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-API-Key header encoding".to_string()))?;
        return Ok(Some(key_str.trim().to_string()).filter(|k| !k.is_empty()));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_no_header_is_anonymous() {
        assert_eq!(extract_api_key(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_bearer_and_x_api_key() {
        assert_eq!(
            extract_api_key(&headers(&[("authorization", "Bearer sp_abc ")])).unwrap(),
            Some("sp_abc".to_string())
        );
        assert_eq!(
            extract_api_key(&headers(&[("x-api-key", "sp_def")])).unwrap(),
            Some("sp_def".to_string())
        );
    }

    #[test]
    fn test_non_bearer_authorization_is_rejected() {
        assert!(matches!(
            extract_api_key(&headers(&[("authorization", "Basic dXNlcg==")])),
            Err(AppError::Unauthorized(_))
        ));
    }
}
