pub mod install;
pub mod publish;
pub mod verify;

use shelf::core::path::{find_listing_root, LISTING_FILE_NAME};
use shelf::core::{ShelfError, ShelfResult};
use shelf::resolver::DependencyListing;
use std::env;
use std::path::PathBuf;

/// Load `file`, or the nearest `shelf.yaml` at or above the current directory
pub fn load_listing(file: Option<PathBuf>) -> ShelfResult<DependencyListing> {
    let path = match file {
        Some(path) => path,
        None => {
            let current_dir = env::current_dir().map_err(|e| {
                ShelfError::Path(format!("Failed to get current directory: {}", e))
            })?;
            find_listing_root(&current_dir)?.join(LISTING_FILE_NAME)
        }
    };

    DependencyListing::load(&path)
}
