//! `GET|POST /proxy`.

use std::sync::Arc;

use axum::Form;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use olive_kernel::proxy::{PROXY_CSP, PROXY_FRAME_OPTIONS, ProxyError, parse_target};

use crate::AppState;

type Fields = Vec<(String, String)>;

/// Target from `?url=`, extra query fields appended to it.
pub async fn proxy_get(
    State(state): State<Arc<AppState>>,
    Query(fields): Query<Fields>,
) -> Response {
    proxy(&state, &fields).await
}

/// Target from a rewritten form submission: query and body fields merged.
pub async fn proxy_post(
    State(state): State<Arc<AppState>>,
    Query(mut fields): Query<Fields>,
    Form(body): Form<Fields>,
) -> Response {
    fields.extend(body);
    proxy(&state, &fields).await
}

async fn proxy(state: &AppState, fields: &[(String, String)]) -> Response {
    let result = match parse_target(fields) {
        Ok(target) => state.fetcher.fetch(&target).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(upstream) => {
            let upstream = upstream.rewrite(&state.rewriter);
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = if upstream.content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                upstream.content_type
            };
            respond(status, content_type, upstream.body)
        }
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &ProxyError) -> Response {
    if err.is_client_error() {
        tracing::warn!(error = %err, "rejected proxy request");
        let message = match err {
            ProxyError::MissingTarget => err.to_string(),
            _ => format!("Invalid ?url: {err}"),
        };
        respond(StatusCode::BAD_REQUEST, text_plain(), message.into_bytes())
    } else {
        tracing::error!(error = %err, "proxy fetch failed");
        respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            text_plain(),
            err.to_string().into_bytes(),
        )
    }
}

fn text_plain() -> String {
    "text/plain; charset=utf-8".to_string()
}

/// Every proxy response carries the framing headers.
fn respond(status: StatusCode, content_type: String, body: Vec<u8>) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_SECURITY_POLICY, PROXY_CSP.to_string()),
            (header::X_FRAME_OPTIONS, PROXY_FRAME_OPTIONS.to_string()),
        ],
        body,
    )
        .into_response()
}
