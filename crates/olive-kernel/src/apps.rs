//! App discovery under the applications directory.
//!
//! Every subdirectory holding an `@manifest.oman` is an app. The manifest's
//! `[runtime] working_directory` points at the app's files, where an
//! optional `@app.oman` lists its `[sources]`.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::manifest::{AppManifest, AppSources, Dimension, ManifestError, WindowType};

/// Manifest file name inside each app folder.
pub const MANIFEST_FILE: &str = "@manifest.oman";

/// Source list inside an app's working directory.
pub const SOURCES_FILE: &str = "@app.oman";

/// URL path the applications directory is served under.
pub const APPS_URL_ROOT: &str = "/data/applicaton";

const DEFAULT_WORKING_DIR: &str = "/source/app";
const DEFAULT_ICON: &str = "source/assets/icon.png";
const DEFAULT_HTML: &str = "index.html";

/// Errors loading a single app.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{path}: {source}")]
    Manifest {
        path: PathBuf,
        source: ManifestError,
    },
}

/// List app folders under `dir`, sorted by name.
///
/// Apps marked `[ui] invisible` are skipped unless `show_all`. An app whose
/// manifest cannot be read or parsed is still listed.
pub async fn discover_apps(dir: &Path, show_all: bool) -> io::Result<Vec<String>> {
    let mut folders = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Ok(folder) = entry.file_name().into_string() else {
            continue;
        };
        let manifest_path = entry.path().join(MANIFEST_FILE);
        if !tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
            continue;
        }

        let invisible = match read_manifest(&manifest_path).await {
            Ok(manifest) => manifest.ui.invisible,
            Err(e) => {
                tracing::warn!(app = %folder, error = %e, "listing app with unreadable manifest");
                false
            }
        };
        if !invisible || show_all {
            folders.push(folder);
        }
    }
    folders.sort();
    tracing::debug!(count = folders.len(), show_all, "discovered apps");
    Ok(folders)
}

async fn read_manifest(path: &Path) -> Result<AppManifest, AppError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let manifest = AppManifest::parse(&text).map_err(|source| AppError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    for warning in &manifest.warnings {
        tracing::warn!(path = %path.display(), "{warning}");
    }
    Ok(manifest)
}

/// Everything the desktop needs to launch an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDescriptor {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub working_dir: String,
    pub iframe: String,
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,
    pub resizable: bool,
    pub fullscreen: bool,
    #[serde(rename = "type")]
    pub window_type: WindowType,
    pub invisible: bool,
}

impl AppDescriptor {
    /// Compute an app's launch details from its manifest and sources.
    ///
    /// `root` is the URL path the applications directory is served under.
    pub fn resolve(
        root: &str,
        folder: &str,
        manifest: &AppManifest,
        sources: Option<&AppSources>,
    ) -> Self {
        let base = format!("{}/{}", root.trim_end_matches('/'), folder);
        let icon = match &manifest.app.icon {
            Some(icon) => format!("{base}/{}", icon.trim_start_matches('/')),
            None => format!("{base}/{DEFAULT_ICON}"),
        };
        let working_dir = normalize_working_dir(manifest.runtime.working_directory.as_deref());
        let html = sources
            .and_then(AppSources::first_html)
            .map(|s| s.trim_start_matches('/'))
            .unwrap_or(DEFAULT_HTML);
        let iframe = collapse_slashes(&format!("{base}{working_dir}/{html}"));

        let ui = &manifest.ui;
        Self {
            id: manifest.app.id.clone().unwrap_or_else(|| folder.to_string()),
            name: manifest.app.name.clone().unwrap_or_else(|| folder.to_string()),
            icon,
            working_dir,
            iframe,
            width: ui.width.clone().unwrap_or(Dimension::Pixels(700)),
            height: ui.height.clone().unwrap_or(Dimension::Pixels(400)),
            min_width: ui.min_width.clone().unwrap_or(Dimension::Pixels(320)),
            min_height: ui.min_height.clone().unwrap_or(Dimension::Pixels(200)),
            max_width: ui.max_width.clone(),
            max_height: ui.max_height.clone(),
            resizable: ui.resizable.unwrap_or(true),
            fullscreen: ui.fullscreen.unwrap_or(false),
            window_type: ui.window_type.unwrap_or_default(),
            invisible: ui.invisible,
        }
    }
}

/// Load one app from `<apps_dir>/<folder>`.
///
/// A missing `@app.oman` falls back to the default HTML file; a broken one
/// is an error.
pub async fn load_app(apps_dir: &Path, folder: &str) -> Result<AppDescriptor, AppError> {
    let app_dir = apps_dir.join(folder);
    let manifest = read_manifest(&app_dir.join(MANIFEST_FILE)).await?;

    let working_dir = normalize_working_dir(manifest.runtime.working_directory.as_deref());
    let sources_path = app_dir
        .join(working_dir.trim_start_matches('/'))
        .join(SOURCES_FILE);
    let sources = if tokio::fs::try_exists(&sources_path).await.unwrap_or(false) {
        Some(read_manifest(&sources_path).await?.sources)
    } else {
        None
    };

    Ok(AppDescriptor::resolve(
        APPS_URL_ROOT,
        folder,
        &manifest,
        sources.as_ref(),
    ))
}

/// `/source/app/` style: leading slash, forward slashes, no whitespace, no
/// trailing slash.
fn normalize_working_dir(dir: Option<&str>) -> String {
    let cleaned: String = dir
        .unwrap_or(DEFAULT_WORKING_DIR)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}
