//! Whole-document stores backing the cloud adapter.
//!
//! A [`DocumentStore`] holds one [`Tree`] per account and only supports
//! fetching or replacing it whole. There is no version token: two writers
//! that interleave their fetch/store cycles lose the first writer's change.

use async_trait::async_trait;
use olive_types::{FsDocument, FsError, FsResult, Tree};
use reqwest::StatusCode;
use url::Url;

use crate::auth::AccessToken;

/// Per-account document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the caller's whole tree. An account with no document yet gets
    /// an empty tree.
    async fn fetch(&self, token: &AccessToken) -> FsResult<Tree>;

    /// Replace the caller's whole tree.
    async fn store(&self, token: &AccessToken, tree: &Tree) -> FsResult<()>;
}

/// Document store reached over HTTP (`GET`/`POST {base}/api/fs`).
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDocumentStore {
    /// Create a store talking to the server at `base`.
    pub fn new(base: &Url) -> FsResult<Self> {
        let endpoint = base
            .join("api/fs")
            .map_err(|e| FsError::Transport(format!("invalid server url {base}: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    /// The document endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn check_status(&self, method: &str, status: StatusCode) -> FsResult<()> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FsError::Unauthorized(format!(
                "{method} {} was rejected ({status})",
                self.endpoint
            )));
        }
        if !status.is_success() {
            return Err(FsError::Transport(format!(
                "{method} {} returned {status}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> FsError {
    FsError::Transport(err.to_string())
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch(&self, token: &AccessToken) -> FsResult<Tree> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(transport)?;
        self.check_status("GET", response.status())?;

        let document: FsDocument = response.json().await.map_err(transport)?;
        Ok(document.fs)
    }

    async fn store(&self, token: &AccessToken, tree: &Tree) -> FsResult<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token.secret())
            .json(&serde_json::json!({ "fs": tree }))
            .send()
            .await
            .map_err(transport)?;
        self.check_status("POST", response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let base = Url::parse("http://127.0.0.1:3000").unwrap();
        let store = HttpDocumentStore::new(&base).unwrap();
        assert_eq!(store.endpoint().as_str(), "http://127.0.0.1:3000/api/fs");

        let nested = Url::parse("https://example.com/olive/").unwrap();
        let store = HttpDocumentStore::new(&nested).unwrap();
        assert_eq!(store.endpoint().as_str(), "https://example.com/olive/api/fs");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let store = HttpDocumentStore::new(&base).unwrap();
        let err = store.fetch(&AccessToken::new("t")).await.unwrap_err();
        assert!(matches!(err, FsError::Transport(_)));
    }
}
