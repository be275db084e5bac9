//! XDG data paths for olive.
//!
//! Local filesystem blobs live under `$XDG_DATA_HOME/olive/storage`
//! (default `~/.local/share/olive/storage`), one `<key>.json` file per key.

use std::path::PathBuf;

use directories::BaseDirs;

/// `$HOME`, or `/tmp` if not set.
fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// XDG data home directory.
fn xdg_data_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
}

/// `$XDG_DATA_HOME/olive`.
fn data_dir() -> PathBuf {
    xdg_data_home().join("olive")
}

/// Default directory for the local filesystem's blob store.
pub fn olive_storage_dir() -> PathBuf {
    data_dir().join("storage")
}
