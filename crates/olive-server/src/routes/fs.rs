//! `GET|POST /api/fs`: the caller's whole filesystem document.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use olive_kernel::{AccessToken, DocumentStore};
use olive_types::{FsDocument, FsError};
use serde_json::json;

use crate::AppState;

/// Cookie the login flow leaves the access token in.
pub const TOKEN_COOKIE: &str = "sb-access-token";

pub async fn get_document(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(token) = access_token(&headers) else {
        return missing_token();
    };
    match state.accounts.fetch(&token).await {
        Ok(fs) => Json(FsDocument { fs }).into_response(),
        Err(e) => fs_error(e),
    }
}

pub async fn put_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(doc): Json<FsDocument>,
) -> Response {
    let Some(token) = access_token(&headers) else {
        return missing_token();
    };
    match state.accounts.store(&token, &doc.fs).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => fs_error(e),
    }
}

/// `Authorization: Bearer <token>` (or a bare token), else the cookie.
pub fn access_token(headers: &HeaderMap) -> Option<AccessToken> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty());
    if let Some(token) = from_header {
        return Some(AccessToken::new(token));
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
        .map(AccessToken::new)
}

fn missing_token() -> Response {
    fs_error(FsError::Unauthorized("missing access token".to_string()))
}

fn fs_error(err: FsError) -> Response {
    let status = match &err {
        FsError::NotFound(_) => StatusCode::NOT_FOUND,
        FsError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        FsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        FsError::Transport(_) => StatusCode::BAD_GATEWAY,
        FsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "document request failed");
    } else {
        tracing::debug!(error = %err, "document request rejected");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        let token = access_token(&headers(&[(header::AUTHORIZATION, "Bearer abc")])).unwrap();
        assert_eq!(token.secret(), "abc");
    }

    #[test]
    fn test_bare_authorization_token() {
        let token = access_token(&headers(&[(header::AUTHORIZATION, "abc")])).unwrap();
        assert_eq!(token.secret(), "abc");
    }

    #[test]
    fn test_cookie_token() {
        let map = headers(&[(header::COOKIE, "theme=dark; sb-access-token=xyz; other=1")]);
        assert_eq!(access_token(&map).unwrap().secret(), "xyz");
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let map = headers(&[
            (header::COOKIE, "sb-access-token=cookie"),
            (header::AUTHORIZATION, "Bearer header"),
        ]);
        assert_eq!(access_token(&map).unwrap().secret(), "header");
    }

    #[test]
    fn test_no_token() {
        assert!(access_token(&HeaderMap::new()).is_none());
        assert!(access_token(&headers(&[(header::COOKIE, "sb-access-token=")])).is_none());
    }
}
