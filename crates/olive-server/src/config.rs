//! Configuration for the olive server and CLI.
//!
//! Configuration is loaded from `~/.config/olive/config.toml`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use olive_kernel::proxy::{DEFAULT_PROXY_ENDPOINT, DEFAULT_USER_AGENT};
use olive_kernel::{CLOUD_PREFIX, TokenTable};
use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OliveConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// `[server]`: the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on. The `PORT` env var replaces the port.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Static files served for every path no route claims.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Directory holding the installed apps.
    #[serde(default = "default_apps_dir")]
    pub apps_dir: PathBuf,

    /// Where per-account documents are mirrored. Memory-only when unset.
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,

    /// Path the proxy is mounted at.
    #[serde(default = "default_proxy_endpoint")]
    pub proxy_endpoint: String,

    /// User agent sent upstream by the proxy.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds; 0 means no deadline.
    #[serde(default)]
    pub proxy_timeout_ms: u64,

    /// Opaque access token -> account id.
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

/// `[client]`: how the CLI reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server holding the cloud document.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Access token for the cloud. The `OLIVE_TOKEN` env var replaces it.
    #[serde(default)]
    pub token: Option<String>,

    /// Local storage directory. Defaults to `$XDG_DATA_HOME/olive/storage`.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// Path prefix routed to the cloud.
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_apps_dir() -> PathBuf {
    PathBuf::from("data/applicaton")
}

fn default_proxy_endpoint() -> String {
    DEFAULT_PROXY_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_remote_prefix() -> String {
    CLOUD_PREFIX.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_dir: default_public_dir(),
            apps_dir: default_apps_dir(),
            documents_dir: None,
            proxy_endpoint: default_proxy_endpoint(),
            user_agent: default_user_agent(),
            proxy_timeout_ms: 0,
            tokens: HashMap::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            token: None,
            storage_dir: None,
            remote_prefix: default_remote_prefix(),
        }
    }
}

impl OliveConfig {
    /// Load configuration from the default path, then apply env overrides.
    ///
    /// If the config file doesn't exist, starts from the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs =
            ProjectDirs::from("", "", "olive").context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `PORT` and `OLIVE_TOKEN` from `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("PORT").filter(|p| !p.trim().is_empty()) {
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map_or(self.server.bind.as_str(), |(host, _)| host);
            self.server.bind = format!("{host}:{}", port.trim());
        }
        if let Some(token) = var("OLIVE_TOKEN").filter(|t| !t.is_empty()) {
            self.client.token = Some(token);
        }
    }
}

impl ServerConfig {
    /// The listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("Invalid bind address {:?}", self.bind))
    }

    /// The proxy's upstream deadline, if any.
    pub fn proxy_timeout(&self) -> Option<Duration> {
        (self.proxy_timeout_ms > 0).then(|| Duration::from_millis(self.proxy_timeout_ms))
    }

    /// The configured tokens as an authenticator.
    pub fn token_table(&self) -> TokenTable {
        self.tokens
            .iter()
            .map(|(token, account)| (token.clone(), account.clone()))
            .collect()
    }
}
