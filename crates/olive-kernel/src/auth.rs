//! Caller identity.
//!
//! Authentication itself belongs to a hosted provider. Here a token is an
//! opaque capability: it either maps to an account or it doesn't.

use std::collections::HashMap;

use async_trait::async_trait;
use olive_types::{FsError, FsResult};

/// An opaque caller identity token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for sending to the provider.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// The account a token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps tokens to accounts.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a token, failing with `Unauthorized` if it is not recognized.
    async fn authenticate(&self, token: &AccessToken) -> FsResult<AccountId>;
}

/// A fixed token → account table, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, AccountId>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` for `account`.
    pub fn with_token(mut self, token: impl Into<String>, account: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), AccountId(account.into()));
        self
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, String)> for TokenTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            tokens: iter
                .into_iter()
                .map(|(token, account)| (token, AccountId(account)))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for TokenTable {
    async fn authenticate(&self, token: &AccessToken) -> FsResult<AccountId> {
        self.tokens
            .get(token.secret())
            .cloned()
            .ok_or_else(|| FsError::Unauthorized("unknown access token".to_string()))
    }
}
