//! olive-server: the HTTP side of the olive desktop.
//!
//! Routes:
//!
//! - `GET|POST /proxy`: fetch an external page and rewrite it for framing
//! - `GET|POST /api/fs`: the caller's per-account filesystem document
//! - `GET /list-apps`: installed app folders
//! - `/data/applicaton/...` and everything else: static files
//!
//! The same crate builds the `olive` binary, which also drives the
//! filesystem from the command line.

pub mod cli;
pub mod config;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use olive_kernel::apps::APPS_URL_ROOT;
use olive_kernel::proxy::{ProxyFetcher, ProxyRewriter};
use olive_kernel::{AccountStore, Authenticator};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub accounts: Arc<AccountStore>,
    pub fetcher: ProxyFetcher,
    pub rewriter: ProxyRewriter,
    pub apps_dir: PathBuf,
}

impl AppState {
    /// Build the handler state from the `[server]` config.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        if !config.proxy_endpoint.starts_with('/') || config.proxy_endpoint.len() < 2 {
            anyhow::bail!(
                "proxy_endpoint must be an absolute path, got {:?}",
                config.proxy_endpoint
            );
        }
        let auth: Arc<dyn Authenticator> = Arc::new(config.token_table());
        let mut accounts = AccountStore::new(auth);
        if let Some(dir) = &config.documents_dir {
            accounts = accounts.with_dir(dir);
        }
        let fetcher = ProxyFetcher::new(&config.user_agent, config.proxy_timeout())
            .context("Failed to build proxy client")?;

        Ok(Self {
            accounts: Arc::new(accounts),
            fetcher,
            rewriter: ProxyRewriter::new(config.proxy_endpoint.clone()),
            apps_dir: config.apps_dir.clone(),
        })
    }
}

/// Assemble the full router. `public_dir` serves every unclaimed path.
pub fn build_router(state: Arc<AppState>, public_dir: impl Into<PathBuf>) -> Router {
    let endpoint = state.rewriter.endpoint().to_string();
    let apps = ServeDir::new(&state.apps_dir);

    Router::new()
        .route(
            &endpoint,
            get(routes::proxy::proxy_get).post(routes::proxy::proxy_post),
        )
        .route(
            "/api/fs",
            get(routes::fs::get_document).post(routes::fs::put_document),
        )
        .route("/list-apps", get(routes::apps::list_apps))
        .nest_service(APPS_URL_ROOT, apps)
        .fallback_service(ServeDir::new(public_dir.into()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::from_config(config)?);
    let app = build_router(state, config.public_dir.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        apps_dir = %config.apps_dir.display(),
        accounts = config.tokens.len(),
        "olive server listening"
    );

    axum::serve(listener, app).await.context("Server error")
}
