//! Checks that installed files match a manifest.
//!
//! Each check is one [`IntegrityCheck`]. [`CompoundCheck`] runs a fixed list of
//! them in order and stops at the first failure, so the expensive content hash
//! only runs once the cheap metadata checks have passed.

use crate::core::path::native_path;
use crate::core::{IntegrityError, Manifest, ShelfResult};
use crate::di::traits::FileSystem;
use crate::package::checksum::ContentHasher;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Verifies installed state under `local` against `manifest`
pub trait IntegrityCheck: Send + Sync {
    fn verify(&self, manifest: &Manifest, local: &Path) -> ShelfResult<()>;
}

/// Every manifest item exists locally with the recorded size. Reads no file content.
pub struct FileListingCheck {
    filesystem: Arc<dyn FileSystem>,
}

impl FileListingCheck {
    pub fn new(filesystem: Arc<dyn FileSystem>) -> Self {
        Self { filesystem }
    }
}

impl IntegrityCheck for FileListingCheck {
    fn verify(&self, manifest: &Manifest, local: &Path) -> ShelfResult<()> {
        let sizes: HashMap<String, u64> = self
            .filesystem
            .list(local)?
            .into_iter()
            .map(|file| (file.path, file.size))
            .collect();

        for item in &manifest.archive.contents {
            match sizes.get(&item.path) {
                None => {
                    return Err(IntegrityError::FileNotFound {
                        path: item.path.clone(),
                    }
                    .into())
                }
                Some(&actual) if actual != item.size => {
                    return Err(IntegrityError::SizeMismatch {
                        path: item.path.clone(),
                        expected: item.size,
                        actual,
                    }
                    .into())
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Every manifest item's local content hashes to the recorded checksum
///
/// Disabled in quick verification mode, where it always succeeds.
pub struct ContentHashCheck {
    filesystem: Arc<dyn FileSystem>,
    enabled: bool,
}

impl ContentHashCheck {
    pub fn new(filesystem: Arc<dyn FileSystem>) -> Self {
        Self {
            filesystem,
            enabled: true,
        }
    }

    pub fn disabled(filesystem: Arc<dyn FileSystem>) -> Self {
        Self {
            filesystem,
            enabled: false,
        }
    }
}

impl IntegrityCheck for ContentHashCheck {
    fn verify(&self, manifest: &Manifest, local: &Path) -> ShelfResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut hasher = ContentHasher::new();
        for item in &manifest.archive.contents {
            let source = self.filesystem.open(&native_path(local, &item.path))?;
            io::copy(&mut hasher.reader(source), &mut io::sink())?;

            let actual = hasher.finish();
            if actual != item.checksum {
                return Err(IntegrityError::ChecksumMismatch {
                    path: item.path.clone(),
                    expected: item.checksum.to_hex(),
                    actual: actual.to_hex(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// The manifest records the expected version
pub struct VersionCheck {
    expected: String,
}

impl VersionCheck {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl IntegrityCheck for VersionCheck {
    fn verify(&self, manifest: &Manifest, _local: &Path) -> ShelfResult<()> {
        if manifest.version != self.expected {
            return Err(IntegrityError::VersionMismatch {
                expected: self.expected.clone(),
                actual: manifest.version.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// Runs checks in order, returning the first failure
#[derive(Default)]
pub struct CompoundCheck {
    checks: Vec<Box<dyn IntegrityCheck>>,
}

impl CompoundCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, check: impl IntegrityCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl IntegrityCheck for CompoundCheck {
    fn verify(&self, manifest: &Manifest, local: &Path) -> ShelfResult<()> {
        for check in &self.checks {
            check.verify(manifest, local)?;
        }
        Ok(())
    }
}

/// Version, then file listing, then (unless `quick`) content hashes
pub fn standard_chain(
    filesystem: Arc<dyn FileSystem>,
    expected_version: &str,
    quick: bool,
) -> CompoundCheck {
    let content = if quick {
        ContentHashCheck::disabled(filesystem.clone())
    } else {
        ContentHashCheck::new(filesystem.clone())
    };

    CompoundCheck::new()
        .with(VersionCheck::new(expected_version))
        .with(FileListingCheck::new(filesystem))
        .with(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Archive, ArchiveItem, CompressionAlgorithm, ShelfError};
    use crate::fs::LocalFileSystem;
    use crate::package::checksum::checksum_bytes;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn manifest_for(files: &[(&str, &str)]) -> Manifest {
        Manifest {
            name: "tool".to_string(),
            version: "1.0.0".to_string(),
            archive: Archive {
                filename: "archive.tar.zst".to_string(),
                size: 0,
                checksum: checksum_bytes(b""),
                contents: files
                    .iter()
                    .map(|(path, data)| ArchiveItem {
                        path: path.to_string(),
                        size: data.len() as u64,
                        checksum: checksum_bytes(data.as_bytes()),
                    })
                    .collect(),
                compression_algorithm: CompressionAlgorithm::Zstd,
            },
        }
    }

    fn install(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, data) in files {
            let target = native_path(temp.path(), path);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, data).unwrap();
        }
        temp
    }

    fn filesystem() -> Arc<dyn FileSystem> {
        Arc::new(LocalFileSystem::new())
    }

    const FILES: &[(&str, &str)] = &[("a", "a"), ("bb", "bb"), ("sub/c", "ccc")];

    #[test]
    fn test_matching_install_passes_full_chain() {
        let local = install(FILES);
        let chain = standard_chain(filesystem(), "1.0.0", false);
        assert_eq!(chain.len(), 3);
        chain.verify(&manifest_for(FILES), local.path()).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let local = install(&FILES[..2]);
        let err = FileListingCheck::new(filesystem())
            .verify(&manifest_for(FILES), local.path())
            .unwrap_err();
        assert!(matches!(
            err,
            ShelfError::Integrity(IntegrityError::FileNotFound { path }) if path == "sub/c"
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let local = install(&[("a", "a"), ("bb", "bbbb"), ("sub/c", "ccc")]);
        let err = FileListingCheck::new(filesystem())
            .verify(&manifest_for(FILES), local.path())
            .unwrap_err();
        assert!(matches!(
            err,
            ShelfError::Integrity(IntegrityError::SizeMismatch {
                expected: 2,
                actual: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_checksum_mismatch_with_same_size() {
        let local = install(&[("a", "a"), ("bb", "xx"), ("sub/c", "ccc")]);
        let manifest = manifest_for(FILES);

        // Same sizes, so the listing check cannot tell
        FileListingCheck::new(filesystem())
            .verify(&manifest, local.path())
            .unwrap();

        let err = ContentHashCheck::new(filesystem())
            .verify(&manifest, local.path())
            .unwrap_err();
        assert!(matches!(
            err,
            ShelfError::Integrity(IntegrityError::ChecksumMismatch { path, .. }) if path == "bb"
        ));
    }

    #[test]
    fn test_quick_mode_skips_content_hash() {
        let local = install(&[("a", "a"), ("bb", "xx"), ("sub/c", "ccc")]);
        let chain = standard_chain(filesystem(), "1.0.0", true);
        chain.verify(&manifest_for(FILES), local.path()).unwrap();
    }

    #[test]
    fn test_version_mismatch() {
        let local = install(FILES);
        let err = VersionCheck::new("2.0.0")
            .verify(&manifest_for(FILES), local.path())
            .unwrap_err();
        assert!(matches!(
            err,
            ShelfError::Integrity(IntegrityError::VersionMismatch { expected, actual })
                if expected == "2.0.0" && actual == "1.0.0"
        ));
    }

    struct Spy {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl IntegrityCheck for Spy {
        fn verify(&self, _manifest: &Manifest, _local: &Path) -> ShelfResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IntegrityError::FileNotFound {
                    path: "a".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_compound_stops_at_first_failure() {
        let listing_calls = Arc::new(AtomicUsize::new(0));
        let hash_calls = Arc::new(AtomicUsize::new(0));
        let chain = CompoundCheck::new()
            .with(Spy {
                calls: listing_calls.clone(),
                fail: true,
            })
            .with(Spy {
                calls: hash_calls.clone(),
                fail: false,
            });

        let local = TempDir::new().unwrap();
        assert!(chain.verify(&manifest_for(FILES), local.path()).is_err());
        assert_eq!(listing_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hash_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_file_never_reaches_content_hash() {
        // The content check would fail with an I/O error on the missing file;
        // the chain must report the listing failure instead.
        let local = install(&FILES[..1]);
        let err = standard_chain(filesystem(), "1.0.0", false)
            .verify(&manifest_for(FILES), local.path())
            .unwrap_err();
        assert!(matches!(
            err,
            ShelfError::Integrity(IntegrityError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_compound_passes() {
        let chain = CompoundCheck::new();
        assert!(chain.is_empty());
        let local = TempDir::new().unwrap();
        chain.verify(&manifest_for(FILES), local.path()).unwrap();
    }
}
