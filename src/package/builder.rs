//! Streams a directory tree into an archive while recording per-file digests.

use crate::core::path::{native_path, METADATA_DIR_NAME};
use crate::core::{Archive, ArchiveItem, CompressionAlgorithm, ShelfError, ShelfResult};
use crate::di::traits::{FileInfo, FileSystem};
use crate::package::archive::{archive_writer, ArchiveWriter, EntryHeader};
use crate::package::checksum::{checksum_file, ContentHasher};
use std::io::Read;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

/// Builds archives from files listed by a [`FileSystem`]
///
/// Owns one [`ContentHasher`] that is reset after every file; a builder is
/// used by one build at a time.
pub struct PackageBuilder<'a> {
    filesystem: &'a dyn FileSystem,
    hasher: ContentHasher,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(filesystem: &'a dyn FileSystem) -> Self {
        Self {
            filesystem,
            hasher: ContentHasher::new(),
        }
    }

    /// Archive every file under `root` (except Shelf's own metadata directory)
    pub fn build(
        &mut self,
        root: &Path,
        writer: Box<dyn ArchiveWriter>,
    ) -> ShelfResult<Vec<ArchiveItem>> {
        let files: Vec<FileInfo> = self
            .filesystem
            .list(root)?
            .into_iter()
            .filter(|file| !is_metadata(&file.path))
            .collect();

        self.build_files(root, &files, writer)
    }

    /// Archive `files` in the given order and close the archive.
    ///
    /// Aborts on the first failure; the returned list has one item per file.
    pub fn build_files(
        &mut self,
        root: &Path,
        files: &[FileInfo],
        mut writer: Box<dyn ArchiveWriter>,
    ) -> ShelfResult<Vec<ArchiveItem>> {
        let mut contents = Vec::with_capacity(files.len());

        for file in files {
            let header = EntryHeader {
                path: file.path.clone(),
                size: file.size,
                modified: file.modified,
            };
            let source = self.filesystem.open(&native_path(root, &file.path))?;

            let mut hashing = self.hasher.reader(source.take(file.size));
            writer.append(&header, &mut hashing)?;
            let written = hashing.bytes_read();

            let checksum = self.hasher.finish();
            if written != file.size {
                return Err(ShelfError::Archive(format!(
                    "{} changed while archiving: listed {} bytes, read {}",
                    file.path, file.size, written
                )));
            }

            tracing::debug!(path = %file.path, size = file.size, checksum = %checksum, "archived");
            contents.push(ArchiveItem {
                path: file.path.clone(),
                size: file.size,
                checksum,
            });
        }

        writer.finish()?;
        Ok(contents)
    }
}

fn is_metadata(path: &str) -> bool {
    path.split('/').next() == Some(METADATA_DIR_NAME)
}

/// An archive written to a temporary file, with its descriptor
pub struct BuiltPackage {
    pub archive: Archive,
    /// Deleted when dropped
    pub path: TempPath,
}

/// Build the archive for `source_dir` into a temporary file
pub fn build_package(
    filesystem: &dyn FileSystem,
    source_dir: &Path,
    algorithm: CompressionAlgorithm,
) -> ShelfResult<BuiltPackage> {
    let (output, path) = NamedTempFile::new()?.into_parts();
    let writer = archive_writer(algorithm, output)?;
    let contents = PackageBuilder::new(filesystem).build(source_dir, writer)?;

    let (checksum, size) = checksum_file(&path)?;
    tracing::info!(
        source = %source_dir.display(),
        files = contents.len(),
        size,
        compression = %algorithm,
        "built archive"
    );

    Ok(BuiltPackage {
        archive: Archive {
            filename: algorithm.archive_filename().to_string(),
            size,
            checksum,
            contents,
            compression_algorithm: algorithm,
        },
        path,
    })
}
