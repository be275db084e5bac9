//! `GET /list-apps[?all=true]`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use olive_kernel::discover_apps;
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListAppsQuery {
    #[serde(default)]
    all: Option<String>,
}

impl ListAppsQuery {
    fn show_all(&self) -> bool {
        matches!(self.all.as_deref(), Some("true" | "1"))
    }
}

/// App folder names; an unreadable apps directory gives 500 with `[]`.
pub async fn list_apps(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAppsQuery>,
) -> (StatusCode, Json<Vec<String>>) {
    match discover_apps(&state.apps_dir, query.show_all()).await {
        Ok(folders) => {
            tracing::debug!(?folders, "listed apps");
            (StatusCode::OK, Json(folders))
        }
        Err(e) => {
            tracing::error!(dir = %state.apps_dir.display(), error = %e, "failed to read apps directory");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::new()))
        }
    }
}
