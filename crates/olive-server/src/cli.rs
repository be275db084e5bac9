//! Command-line consumers of the filesystem and app list.
//!
//! Each `olive fs` invocation builds a [`Session`] the same way the desktop
//! does (local storage on disk, cloud behind the configured server), runs one
//! operation, and prints the result.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use olive_kernel::{
    AccessToken, CloudFs, FileBlobStore, Filesystem, HttpDocumentStore, LocalFs, LogLevel,
    OliveFs, Session, discover_apps, load_app,
};
use olive_types::DirEntry;
use url::Url;

use crate::config::ClientConfig;

/// `olive fs` operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FsCommand {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file
    Cat { path: String },
    /// Write text to a file, replacing it
    Write { path: String, text: String },
    /// Remove a file or directory tree
    Rm { path: String },
    /// Create a directory
    Mkdir { path: String },
    /// Describe a file or directory as JSON
    Stat { path: String },
    /// Clear local storage and the cloud document
    Reset,
}

/// Build a session from the `[client]` config.
pub fn build_session(config: &ClientConfig) -> Result<Session> {
    let storage = match &config.storage_dir {
        Some(dir) => FileBlobStore::new(dir),
        None => FileBlobStore::in_data_dir(),
    };
    tracing::debug!(root = %storage.root().display(), "local storage");
    let local = Arc::new(LocalFs::new(Arc::new(storage)));

    let server = Url::parse(&config.server_url)
        .with_context(|| format!("Invalid server_url {:?}", config.server_url))?;
    let documents = HttpDocumentStore::new(&server).context("Failed to set up cloud client")?;
    let mut cloud = CloudFs::new(Arc::new(documents));
    if let Some(token) = &config.token {
        cloud = cloud.with_token(AccessToken::new(token.clone()));
    }
    let cloud = Arc::new(cloud);

    let fs = OliveFs::new(local, cloud.clone()).with_prefix(&config.remote_prefix);
    Ok(Session::new(fs).with_cloud(cloud))
}

/// Run one filesystem command against `session`, printing to `out`.
pub async fn run_fs(session: &Session, command: FsCommand, out: &mut dyn Write) -> Result<()> {
    let fs = session.fs();
    match command {
        FsCommand::Ls { path } => {
            let entries = fs
                .list_dir(&path)
                .await
                .with_context(|| format!("ls {path}"))?;
            for entry in &entries {
                writeln!(out, "{}", format_entry(entry))?;
            }
        }
        FsCommand::Cat { path } => {
            let data = fs
                .read_file(&path)
                .await
                .with_context(|| format!("cat {path}"))?;
            write!(out, "{data}")?;
            if !data.ends_with('\n') {
                writeln!(out)?;
            }
        }
        FsCommand::Write { path, text } => {
            fs.write_file(&path, &text)
                .await
                .with_context(|| format!("write {path}"))?;
            session
                .log()
                .log("fs", &format!("wrote {path}"), LogLevel::Info);
        }
        FsCommand::Rm { path } => {
            fs.delete_file(&path)
                .await
                .with_context(|| format!("rm {path}"))?;
            session
                .log()
                .log("fs", &format!("removed {path}"), LogLevel::Info);
        }
        FsCommand::Mkdir { path } => {
            fs.mkdir(&path)
                .await
                .with_context(|| format!("mkdir {path}"))?;
            session
                .log()
                .log("fs", &format!("created {path}"), LogLevel::Info);
        }
        FsCommand::Stat { path } => {
            let entry = fs.stat(&path).await.with_context(|| format!("stat {path}"))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&entry)?)?;
        }
        FsCommand::Reset => {
            fs.reset().await.context("reset")?;
            session
                .log()
                .log("fs", "filesystem reset", LogLevel::Warn);
        }
    }
    Ok(())
}

/// `d         0  docs` / `f        11  notes.txt`
fn format_entry(entry: &DirEntry) -> String {
    let kind = if entry.is_dir() { 'd' } else { 'f' };
    format!("{kind} {:>9}  {}", entry.size, entry.name)
}

/// List installed apps, as names or as full descriptors.
pub async fn run_apps(dir: &Path, show_all: bool, json: bool, out: &mut dyn Write) -> Result<()> {
    let folders = discover_apps(dir, show_all)
        .await
        .with_context(|| format!("Failed to read apps directory {}", dir.display()))?;

    if !json {
        for folder in &folders {
            writeln!(out, "{folder}")?;
        }
        return Ok(());
    }

    let mut apps = Vec::with_capacity(folders.len());
    for folder in &folders {
        match load_app(dir, folder).await {
            Ok(app) => apps.push(app),
            Err(e) => tracing::warn!(app = %folder, error = %e, "skipping app"),
        }
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&apps)?)?;
    Ok(())
}
