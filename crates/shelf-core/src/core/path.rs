use crate::core::error::{ShelfError, ShelfResult};
use std::path::{Path, PathBuf};

/// Name of the dependency listing file looked up by `install` and `verify`.
pub const LISTING_FILE_NAME: &str = "shelf.yaml";

/// Directory, relative to an installation root, holding local manifests.
pub const METADATA_DIR_NAME: &str = ".shelf";

/// Environment variable overriding the Shelf home directory.
pub const SHELF_HOME_ENV: &str = "SHELF_HOME";

/// Get the Shelf home directory
///
/// `$SHELF_HOME` wins when set. Otherwise, platform-specific locations:
/// - Windows: %APPDATA%\shelf
/// - Linux: ~/.config/shelf
/// - macOS: ~/Library/Application Support/shelf
pub fn shelf_home() -> ShelfResult<PathBuf> {
    if let Some(home) = std::env::var_os(SHELF_HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ShelfError::Path("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("shelf"))
}

/// Get the config file path (`<shelf home>/config.yaml`)
pub fn config_file() -> ShelfResult<PathBuf> {
    Ok(shelf_home()?.join("config.yaml"))
}

/// Get the metadata directory of an installation root (`<local>/.shelf`)
pub fn metadata_dir(local_directory: &Path) -> PathBuf {
    local_directory.join(METADATA_DIR_NAME)
}

/// Get the local manifest path for a package installed under `local_directory`.
///
/// Deterministic in `(local_directory, package_name)`, so several packages can
/// share one installation root without overwriting each other's manifests.
pub fn local_manifest_path(local_directory: &Path, package_name: &str) -> PathBuf {
    metadata_dir(local_directory).join(format!("{}.manifest.json", package_name))
}

/// Find the directory holding `shelf.yaml`, starting at `start` and walking up.
pub fn find_listing_root(start: &Path) -> ShelfResult<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(LISTING_FILE_NAME).exists() {
            return Ok(current);
        }

        if let Some(parent) = current.parent() {
            current = parent.to_path_buf();
        } else {
            return Err(ShelfError::Path(format!(
                "Could not find {} in current directory or parents",
                LISTING_FILE_NAME
            )));
        }
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> ShelfResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Convert an archive-relative path (always `/`-separated) into a native path under `root`.
pub fn native_path(root: &Path, archive_path: &str) -> PathBuf {
    archive_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}
