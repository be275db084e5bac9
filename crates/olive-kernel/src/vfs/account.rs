//! Server-side per-account document store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use olive_types::{FsError, FsResult, Tree};
use tokio::sync::RwLock;

use super::remote::DocumentStore;
use crate::auth::{AccessToken, AccountId, Authenticator};

/// Holds one tree per account, optionally mirrored to `<dir>/<account>.json`
/// with the account id percent-encoded.
///
/// Documents are replaced whole; the lock only guards the map itself.
pub struct AccountStore {
    auth: Arc<dyn Authenticator>,
    documents: RwLock<HashMap<AccountId, Tree>>,
    dir: Option<PathBuf>,
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl AccountStore {
    /// Create a memory-only store.
    pub fn new(auth: Arc<dyn Authenticator>) -> Self {
        Self {
            auth,
            documents: RwLock::new(HashMap::new()),
            dir: None,
        }
    }

    /// Mirror every document to a JSON file under `dir`.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Fetch an account's tree without a token.
    pub async fn load(&self, account: &AccountId) -> FsResult<Tree> {
        if let Some(tree) = self.documents.read().await.get(account) {
            return Ok(tree.clone());
        }

        let Some(path) = self.document_path(account) else {
            return Ok(Tree::new());
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let tree: Tree = serde_json::from_str(&raw)?;
                // A save may have landed while the file was being read.
                let mut documents = self.documents.write().await;
                Ok(documents.entry(account.clone()).or_insert(tree).clone())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tree::new()),
            Err(e) => Err(FsError::Storage(format!("{}: {e}", path.display()))),
        }
    }

    /// Replace an account's tree without a token.
    pub async fn save(&self, account: &AccountId, tree: &Tree) -> FsResult<()> {
        if let Some(path) = self.document_path(account) {
            write_document(&path, tree).await?;
        }
        self.documents
            .write()
            .await
            .insert(account.clone(), tree.clone());
        tracing::debug!(%account, "stored account document");
        Ok(())
    }

    fn document_path(&self, account: &AccountId) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let name: String = url::form_urlencoded::byte_serialize(account.0.as_bytes()).collect();
        Some(dir.join(format!("{name}.json")))
    }
}

async fn write_document(path: &Path, tree: &Tree) -> FsResult<()> {
    let storage_err = |e: std::io::Error| FsError::Storage(format!("{}: {e}", path.display()));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
    }
    let raw = serde_json::to_string(tree)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, raw).await.map_err(storage_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(storage_err)
}

#[async_trait]
impl DocumentStore for AccountStore {
    async fn fetch(&self, token: &AccessToken) -> FsResult<Tree> {
        let account = self.auth.authenticate(token).await?;
        self.load(&account).await
    }

    async fn store(&self, token: &AccessToken, tree: &Tree) -> FsResult<()> {
        let account = self.auth.authenticate(token).await?;
        self.save(&account, tree).await
    }
}
