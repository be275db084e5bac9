//! Remote ("cloud") filesystem adapter.
//!
//! Every call fetches the caller's whole document, runs one tree operation
//! against the copy, and for mutations stores the whole document back. There
//! is no locking and no version check, so concurrent writers under one
//! account race and the last store wins.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use olive_types::{DirEntry, FsError, FsResult, Tree};

use super::clock::{Clock, SystemClock};
use super::remote::DocumentStore;
use super::traits::Filesystem;
use super::tree::{self, ParentPolicy};
use crate::auth::AccessToken;

/// Filesystem adapter over a remote per-account document.
pub struct CloudFs {
    store: Arc<dyn DocumentStore>,
    token: RwLock<Option<AccessToken>>,
    clock: Arc<dyn Clock>,
    policy: ParentPolicy,
}

impl std::fmt::Debug for CloudFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFs")
            .field("signed_in", &self.is_signed_in())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CloudFs {
    /// Create a signed-out adapter over `store`.
    ///
    /// Missing parent directories are created on `mkdir` and `write_file`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            token: RwLock::new(None),
            clock: Arc::new(SystemClock),
            policy: ParentPolicy::CreateParents,
        }
    }

    /// Start signed in with `token`.
    pub fn with_token(self, token: AccessToken) -> Self {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
        self
    }

    /// Use a different time source for node timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Change how missing parent directories are handled.
    pub fn with_parent_policy(mut self, policy: ParentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the caller identity used for every subsequent call.
    pub fn login(&self, token: AccessToken) -> FsResult<()> {
        *self.token.write().map_err(|_| poisoned())? = Some(token);
        Ok(())
    }

    /// Forget the caller identity.
    pub fn logout(&self) -> FsResult<()> {
        *self.token.write().map_err(|_| poisoned())? = None;
        Ok(())
    }

    /// Returns true if a caller identity is set.
    pub fn is_signed_in(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    fn token(&self) -> FsResult<AccessToken> {
        self.token
            .read()
            .map_err(|_| poisoned())?
            .clone()
            .ok_or_else(|| FsError::Unauthorized("not signed in".to_string()))
    }

    async fn read<R, F>(&self, op: F) -> FsResult<R>
    where
        F: FnOnce(&Tree) -> FsResult<R> + Send,
    {
        let token = self.token()?;
        let tree = self.store.fetch(&token).await?;
        op(&tree)
    }

    async fn modify<R, F>(&self, op: F) -> FsResult<R>
    where
        F: FnOnce(&mut Tree) -> FsResult<R> + Send,
        R: Send,
    {
        let token = self.token()?;
        let mut tree = self.store.fetch(&token).await?;
        let result = op(&mut tree)?;
        self.store.store(&token, &tree).await?;
        Ok(result)
    }
}

fn poisoned() -> FsError {
    FsError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl Filesystem for CloudFs {
    async fn list_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        tracing::debug!(path, "cloud list_dir");
        self.read(|tree| tree::list_dir(tree, path)).await
    }

    async fn read_file(&self, path: &str) -> FsResult<String> {
        tracing::debug!(path, "cloud read_file");
        self.read(|tree| tree::read_file(tree, path)).await
    }

    async fn write_file(&self, path: &str, data: &str) -> FsResult<()> {
        tracing::debug!(path, bytes = data.len(), "cloud write_file");
        let now = self.clock.now_millis();
        let policy = self.policy;
        self.modify(|tree| tree::write_file(tree, path, data, now, policy))
            .await
    }

    async fn delete_file(&self, path: &str) -> FsResult<()> {
        tracing::debug!(path, "cloud delete_file");
        self.modify(|tree| tree::delete(tree, path)).await
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        tracing::debug!(path, "cloud mkdir");
        let policy = self.policy;
        self.modify(|tree| tree::mkdir(tree, path, policy)).await
    }

    async fn stat(&self, path: &str) -> FsResult<DirEntry> {
        self.read(|tree| tree::stat(tree, path)).await
    }

    async fn reset(&self) -> FsResult<()> {
        tracing::debug!("cloud reset");
        let token = self.token()?;
        self.store.store(&token, &Tree::new()).await
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        self.read(|tree| Ok(tree::exists(tree, path))).await
    }

    async fn is_dir(&self, path: &str) -> FsResult<bool> {
        self.read(|tree| Ok(tree::is_dir(tree, path))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authenticator, TokenTable};
    use crate::vfs::{AccountStore, StepClock};

    fn store() -> Arc<AccountStore> {
        let auth: Arc<dyn Authenticator> = Arc::new(TokenTable::new().with_token("t", "alice"));
        Arc::new(AccountStore::new(auth))
    }

    fn signed_in(store: Arc<AccountStore>) -> CloudFs {
        CloudFs::new(store)
            .with_token(AccessToken::new("t"))
            .with_clock(Arc::new(StepClock::new(1, 1)))
    }

    #[tokio::test]
    async fn test_signed_out_is_unauthorized() {
        let fs = CloudFs::new(store());
        let err = fs.list_dir("/").await.unwrap_err();
        assert!(matches!(err, FsError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = signed_in(store());
        fs.write_file("/notes.txt", "remember").await.unwrap();
        assert_eq!(fs.read_file("/notes.txt").await.unwrap(), "remember");
    }

    #[tokio::test]
    async fn test_mkdir_creates_parents() {
        let fs = signed_in(store());
        fs.mkdir("/a/b/c").await.unwrap();
        assert!(fs.is_dir("/a").await.unwrap());
        assert!(fs.is_dir("/a/b/c").await.unwrap());
    }

    #[tokio::test]
    async fn test_strict_policy_matches_local() {
        let fs = signed_in(store()).with_parent_policy(ParentPolicy::Strict);
        assert!(fs.mkdir("/a/b").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_second_write_advances_modified() {
        let fs = signed_in(store());
        fs.write_file("/f", "1").await.unwrap();
        let first = fs.stat("/f").await.unwrap();
        fs.write_file("/f", "22").await.unwrap();
        let second = fs.stat("/f").await.unwrap();
        assert_eq!(first.created, second.created);
        assert!(second.modified > first.modified);
        assert_eq!(second.size, 2);
    }

    #[tokio::test]
    async fn test_changes_are_visible_to_other_sessions() {
        let shared = store();
        let laptop = signed_in(shared.clone());
        let phone = signed_in(shared);

        laptop.write_file("/shared.txt", "synced").await.unwrap();
        assert_eq!(phone.read_file("/shared.txt").await.unwrap(), "synced");
    }

    #[tokio::test]
    async fn test_logout_revokes_access() {
        let fs = signed_in(store());
        fs.mkdir("/x").await.unwrap();
        fs.logout().unwrap();
        assert!(matches!(
            fs.exists("/x").await,
            Err(FsError::Unauthorized(_))
        ));
        fs.login(AccessToken::new("t")).unwrap();
        assert!(fs.exists("/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_clears_document() {
        let fs = signed_in(store());
        fs.write_file("/a", "a").await.unwrap();
        fs.reset().await.unwrap();
        assert!(fs.list_dir("/").await.unwrap().is_empty());
    }
}
