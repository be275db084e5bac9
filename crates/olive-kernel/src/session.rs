//! Per-desktop session context.
//!
//! One `Session` is built at startup and handed to every consumer (terminal,
//! explorer, editor). It owns the filesystem facade, the session log, and the
//! list of open apps.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use olive_types::{FsError, FsResult};

use crate::auth::AccessToken;
use crate::vfs::{CloudFs, OliveFs};

/// Default number of entries a [`LogStore`] keeps.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Severity of a session log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    /// Four-letter label used in rendered entries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERRR",
            Self::Critical => "CRIT",
        }
    }
}

/// One session log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {}: {}",
            self.level.label(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.source,
            self.message
        )
    }
}

/// Bounded, in-order log of session events.
///
/// Every entry is also emitted through `tracing`.
#[derive(Debug)]
pub struct LogStore {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogStore {
    /// Create a store keeping at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry, dropping the oldest one when full.
    pub fn log(&self, source: &str, message: &str, level: LogLevel) {
        match level {
            LogLevel::Info => tracing::info!(source, "{message}"),
            LogLevel::Warn => tracing::warn!(source, "{message}"),
            LogLevel::Error | LogLevel::Critical => {
                tracing::error!(source, level = level.label(), "{message}")
            }
        }

        let entry = LogEntry {
            level,
            timestamp: Utc::now(),
            source: source.to_string(),
            message: message.to_string(),
        };
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// All retained entries rendered as lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Open apps in launch order, with one focused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenApps {
    apps: Vec<String>,
    focused: Option<usize>,
}

impl OpenApps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `id` and focus it. Returns false if it was already open (it is
    /// focused either way).
    pub fn open(&mut self, id: &str) -> bool {
        if self.focus(id) {
            return false;
        }
        self.apps.push(id.to_string());
        self.focused = Some(self.apps.len() - 1);
        true
    }

    /// Close `id`, focusing the most recently opened remaining app.
    pub fn close(&mut self, id: &str) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.apps.remove(idx);
        self.focused = self.apps.len().checked_sub(1);
        true
    }

    /// Focus `id` if it is open.
    pub fn focus(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.focused = Some(idx);
                true
            }
            None => false,
        }
    }

    /// Move focus to the next (or previous) open app, wrapping around.
    pub fn cycle(&mut self, forward: bool) -> Option<&str> {
        let len = self.apps.len();
        if len == 0 {
            return None;
        }
        let current = self.focused.unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.focused = Some(next);
        self.focused()
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused
            .and_then(|i| self.apps.get(i))
            .map(String::as_str)
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Open app ids in launch order.
    pub fn list(&self) -> &[String] {
        &self.apps
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.apps.iter().position(|a| a == id)
    }
}

/// The desktop's shared state.
#[derive(Debug)]
pub struct Session {
    fs: Arc<OliveFs>,
    cloud: Option<Arc<CloudFs>>,
    log: LogStore,
    apps: Mutex<OpenApps>,
}

impl Session {
    pub fn new(fs: OliveFs) -> Self {
        Self {
            fs: Arc::new(fs),
            cloud: None,
            log: LogStore::default(),
            apps: Mutex::new(OpenApps::new()),
        }
    }

    /// Keep a handle to the remote adapter so the session can sign in/out.
    pub fn with_cloud(mut self, cloud: Arc<CloudFs>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = LogStore::new(capacity);
        self
    }

    /// The filesystem facade.
    pub fn fs(&self) -> &Arc<OliveFs> {
        &self.fs
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    /// Lock the open-app list.
    pub fn apps(&self) -> MutexGuard<'_, OpenApps> {
        self.apps.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sign in to the remote filesystem.
    pub fn login(&self, token: AccessToken) -> FsResult<()> {
        self.cloud()?.login(token)?;
        self.log.log("session", "signed in", LogLevel::Info);
        Ok(())
    }

    /// Sign out of the remote filesystem.
    pub fn logout(&self) -> FsResult<()> {
        self.cloud()?.logout()?;
        self.log.log("session", "signed out", LogLevel::Info);
        Ok(())
    }

    fn cloud(&self) -> FsResult<&CloudFs> {
        self.cloud.as_deref().ok_or_else(|| {
            FsError::InvalidOperation("session has no remote filesystem".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authenticator, TokenTable};
    use crate::vfs::{AccountStore, Filesystem, LocalFs};

    #[test]
    fn test_log_entry_format() {
        let entry = LogEntry {
            level: LogLevel::Error,
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            source: "explorer".to_string(),
            message: "cannot open /x".to_string(),
        };
        assert_eq!(
            entry.to_string(),
            "[ERRR] 2024-05-01T12:30:00.000Z | explorer: cannot open /x"
        );
    }

    #[test]
    fn test_log_store_is_bounded() {
        let store = LogStore::new(2);
        store.log("a", "one", LogLevel::Info);
        store.log("a", "two", LogLevel::Warn);
        store.log("a", "three", LogLevel::Critical);

        let entries = store.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "two");
        assert_eq!(entries[1].level, LogLevel::Critical);
        assert!(store.lines()[1].starts_with("[CRIT] "));
    }

    #[test]
    fn test_open_apps_focus() {
        let mut apps = OpenApps::new();
        assert!(apps.open("terminal"));
        assert!(apps.open("explorer"));
        assert_eq!(apps.focused(), Some("explorer"));

        assert!(!apps.open("terminal"));
        assert_eq!(apps.focused(), Some("terminal"));
        assert_eq!(apps.list(), ["terminal", "explorer"]);

        assert_eq!(apps.cycle(true), Some("explorer"));
        assert_eq!(apps.cycle(true), Some("terminal"));
        assert_eq!(apps.cycle(false), Some("explorer"));

        assert!(apps.close("explorer"));
        assert!(!apps.close("explorer"));
        assert_eq!(apps.focused(), Some("terminal"));
        assert!(apps.close("terminal"));
        assert_eq!(apps.focused(), None);
        assert_eq!(apps.cycle(true), None);
    }

    fn session() -> Session {
        let auth: Arc<dyn Authenticator> = Arc::new(TokenTable::new().with_token("t", "alice"));
        let cloud = Arc::new(CloudFs::new(Arc::new(AccountStore::new(auth))));
        let fs = OliveFs::new(Arc::new(LocalFs::in_memory()), cloud.clone());
        Session::new(fs).with_cloud(cloud)
    }

    #[tokio::test]
    async fn test_session_login_reaches_cloud() {
        let session = session();
        assert!(session.fs().list_dir("/cloud").await.is_err());

        session.login(AccessToken::new("t")).unwrap();
        session.fs().write_file("/cloud/a.txt", "hi").await.unwrap();
        assert_eq!(session.fs().read_file("/cloud/a.txt").await.unwrap(), "hi");

        session.logout().unwrap();
        assert!(session.fs().read_file("/cloud/a.txt").await.is_err());
        assert_eq!(session.log().len(), 2);
    }

    #[test]
    fn test_session_log_capacity() {
        let session = session().with_log_capacity(1);
        session.log().log("a", "one", LogLevel::Info);
        session.log().log("a", "two", LogLevel::Info);
        assert_eq!(session.log().entries()[0].message, "two");
        session.log().clear();
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_session_without_cloud() {
        let session = Session::new(OliveFs::new(
            Arc::new(LocalFs::in_memory()),
            Arc::new(LocalFs::in_memory()),
        ));
        assert!(matches!(
            session.login(AccessToken::new("t")),
            Err(FsError::InvalidOperation(_))
        ));
    }
}
