use crate::core::{ShelfError, ShelfResult};
use crate::di::traits::{FileInfo, FileSystem};
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Component, Path};
use walkdir::WalkDir;

/// File access backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn list(&self, root: &Path) -> ShelfResult<Vec<FileInfo>> {
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).map_err(|_| {
                ShelfError::Path(format!(
                    "{} is not under {}",
                    entry.path().display(),
                    root.display()
                ))
            })?;
            let metadata = entry.metadata()?;

            files.push(FileInfo {
                path: to_archive_path(relative)?,
                size: metadata.len(),
                modified: metadata.modified()?,
            });
        }

        // Directory walks order siblings, not whole paths ("a/x" vs "a-b").
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn open(&self, path: &Path) -> ShelfResult<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn remove(&self, path: &Path) -> ShelfResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_empty_dir(&self, path: &Path) -> ShelfResult<bool> {
        let mut entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if entries.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(path)?;
        Ok(true)
    }
}

/// Render a relative native path as an archive path (`/`-separated, UTF-8).
pub fn to_archive_path(relative: &Path) -> ShelfResult<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| {
                    ShelfError::Path(format!("Non UTF-8 path: {}", relative.display()))
                })?;
                segments.push(segment);
            }
            Component::CurDir => {}
            _ => {
                return Err(ShelfError::Path(format!(
                    "Not a relative path: {}",
                    relative.display()
                )))
            }
        }
    }
    Ok(segments.join("/"))
}
