use crate::core::path::{ensure_dir, local_manifest_path, metadata_dir};
use crate::core::{IntegrityError, Manifest, ShelfError, ShelfResult};
use crate::di::traits::{Expect, RemoteStorage};
use crate::package::archive::extract;
use crate::package::checksum::checksum_bytes;
use crate::storage::address::RemoteAddress;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// One remote object to fetch into one local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub remote_address: RemoteAddress,
    pub local_path: PathBuf,
}

impl InstallRequest {
    pub fn new(remote_address: RemoteAddress, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_address,
            local_path: local_path.into(),
        }
    }
}

/// Downloads manifests and archives and unpacks archives into place
///
/// Never retries on its own; hand it a [`RetryStorage`](crate::storage::RetryStorage)
/// for that.
pub struct PackageInstaller {
    storage: Arc<dyn RemoteStorage>,
}

impl PackageInstaller {
    pub fn new(storage: Arc<dyn RemoteStorage>) -> Self {
        Self { storage }
    }

    /// Download and decode the manifest at `request.remote_address`
    pub async fn install_manifest(&self, request: &InstallRequest) -> ShelfResult<Manifest> {
        let data = self
            .storage
            .download(&request.remote_address, Expect::Present)
            .await?;
        Manifest::decode(&data)
    }

    /// Download the archive at `request.remote_address` and unpack it into
    /// `request.local_path`, then record `manifest` as installed there.
    ///
    /// The archive must match the size and checksum the manifest records.
    /// Every file is written to a temporary sibling and renamed into place, so
    /// no file is ever visible half-written. A failure part way through
    /// leaves the files already renamed; the next resolution finds no local
    /// manifest and installs again.
    pub async fn install_package(
        &self,
        manifest: &Manifest,
        request: &InstallRequest,
    ) -> ShelfResult<()> {
        let data = self
            .storage
            .download(&request.remote_address, Expect::Present)
            .await?;
        verify_archive(manifest, &data)?;

        let algorithm = manifest.archive.compression_algorithm;
        let destination = request.local_path.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            ensure_dir(&destination)?;
            extract(algorithm, &data, &destination)
        })
        .await
        .map_err(|e| ShelfError::Task(format!("extraction task failed: {}", e)))??;

        tracing::debug!(
            package = %manifest.name,
            files = extracted.len(),
            local = %request.local_path.display(),
            "extracted archive"
        );

        let local_path = request.local_path.clone();
        let manifest = manifest.clone();
        blocking(move || write_local_manifest(&local_path, &manifest)).await?;
        Ok(())
    }
}

/// Run blocking disk work off the async workers
pub(crate) async fn blocking<T, F>(work: F) -> ShelfResult<T>
where
    F: FnOnce() -> ShelfResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ShelfError::Task(format!("disk task failed: {}", e)))?
}

/// [`read_local_manifest`] on a blocking thread
pub async fn load_local_manifest(
    local_directory: &Path,
    package_name: &str,
) -> ShelfResult<Option<Manifest>> {
    let local_directory = local_directory.to_path_buf();
    let package_name = package_name.to_string();
    blocking(move || read_local_manifest(&local_directory, &package_name)).await
}

/// Compare downloaded archive bytes with the manifest's descriptor
pub fn verify_archive(manifest: &Manifest, data: &[u8]) -> ShelfResult<()> {
    let archive = &manifest.archive;

    if data.len() as u64 != archive.size {
        return Err(IntegrityError::SizeMismatch {
            path: archive.filename.clone(),
            expected: archive.size,
            actual: data.len() as u64,
        }
        .into());
    }

    let actual = checksum_bytes(data);
    if actual != archive.checksum {
        return Err(IntegrityError::ChecksumMismatch {
            path: archive.filename.clone(),
            expected: archive.checksum.to_hex(),
            actual: actual.to_hex(),
        }
        .into());
    }

    Ok(())
}

/// Record `manifest` as installed under `local_directory`
///
/// Written to a temporary file first, so a reader sees either the old
/// manifest or the new one.
pub fn write_local_manifest(local_directory: &Path, manifest: &Manifest) -> ShelfResult<PathBuf> {
    let path = local_manifest_path(local_directory, &manifest.name);
    let parent = path
        .parent()
        .ok_or_else(|| ShelfError::Path(format!("Invalid manifest path: {}", path.display())))?;
    ensure_dir(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(&manifest.encode()?)?;
    staged.persist(&path).map_err(|e| ShelfError::Io(e.error))?;

    Ok(path)
}

/// Read the manifest recorded for `package_name` under `local_directory`
///
/// `Ok(None)` when nothing is recorded. A file that exists but does not
/// decode is a [`ShelfError::ManifestDecode`].
pub fn read_local_manifest(
    local_directory: &Path,
    package_name: &str,
) -> ShelfResult<Option<Manifest>> {
    let path = local_manifest_path(local_directory, package_name);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Manifest::decode(&data)
        .map(Some)
        .map_err(|e| ShelfError::ManifestDecode {
            path,
            reason: e.to_string(),
        })
}

/// Every manifest recorded under `local_directory` except `package_name`'s own
///
/// Records that do not decode are skipped; resolving their own package
/// reports them.
pub fn read_other_manifests(
    local_directory: &Path,
    package_name: &str,
) -> ShelfResult<Vec<Manifest>> {
    let entries = match std::fs::read_dir(metadata_dir(local_directory)) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut manifests = Vec::new();
    for entry in entries {
        let file_name = entry?.file_name();
        let Some(owner) = file_name
            .to_str()
            .and_then(|name| name.strip_suffix(".manifest.json"))
        else {
            continue;
        };
        if owner == package_name {
            continue;
        }

        match read_local_manifest(local_directory, owner) {
            Ok(Some(manifest)) => manifests.push(manifest),
            Ok(None) => {}
            Err(e) => tracing::warn!(package = owner, error = %e, "skipping unreadable record"),
        }
    }

    manifests.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(manifests)
}
