//! olive-kernel: the core of the olive desktop.
//!
//! This crate provides:
//!
//! - **VFS**: one path-tree model behind a local adapter, a remote per-account
//!   adapter, and a facade that routes `/cloud` to the remote side
//! - **Proxy**: fetching external pages and rewriting them to load through
//!   the proxy endpoint
//! - **Apps**: `.oman` manifest parsing and app discovery
//! - **Session**: the context object consumers share (filesystem, log, open
//!   apps)
//! - **Paths**: XDG data directory for local storage

pub mod apps;
pub mod auth;
pub mod manifest;
pub mod paths;
pub mod proxy;
pub mod session;
pub mod vfs;

pub use apps::{AppDescriptor, AppError, discover_apps, load_app};
pub use auth::{AccessToken, AccountId, Authenticator, TokenTable};
pub use manifest::{AppManifest, AppSources, ManifestError, ManifestWarning};
pub use session::{LogEntry, LogLevel, LogStore, OpenApps, Session};
pub use vfs::{
    AccountStore, CLOUD_PREFIX, CloudFs, DocumentStore, FileBlobStore, Filesystem,
    HttpDocumentStore, LocalFs, MemoryBlobStore, OliveFs, ParentPolicy,
};
