use crate::core::{
    CompressionAlgorithm, Manifest, ShelfError, ShelfResult, MANIFEST_CONTENT_TYPE,
};
use crate::di::traits::{Expect, FileSystem, RemoteStorage, UploadBody, UploadRequest};
use crate::package::builder::build_package;
use crate::package::checksum::checksum_bytes;
use crate::storage::address::{artifact_address, manifest_address, RemoteAddress};
use std::path::PathBuf;
use std::sync::Arc;

/// A directory to publish as `name` `version` under `remote_prefix`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub name: String,
    pub version: String,
    pub source_dir: PathBuf,
    pub remote_prefix: RemoteAddress,
    pub compression: CompressionAlgorithm,
}

impl PublishRequest {
    fn validate(&self) -> ShelfResult<()> {
        for (field, value) in [("name", &self.name), ("version", &self.version)] {
            let value = value.trim();
            if value.is_empty() || value == "." || value == ".." || value.contains('/') {
                return Err(ShelfError::Validation(format!(
                    "Package {} '{}' must be a single non-empty path segment",
                    field, value
                )));
            }
        }
        if !self.source_dir.is_dir() {
            return Err(ShelfError::Validation(format!(
                "Source directory {} does not exist",
                self.source_dir.display()
            )));
        }
        Ok(())
    }
}

/// Builds a package archive and uploads it with its manifest
///
/// Published versions are immutable: publishing over an existing manifest
/// fails with [`ShelfError::AlreadyExists`].
pub struct Publisher {
    storage: Arc<dyn RemoteStorage>,
    filesystem: Arc<dyn FileSystem>,
}

impl Publisher {
    pub fn new(storage: Arc<dyn RemoteStorage>, filesystem: Arc<dyn FileSystem>) -> Self {
        Self {
            storage,
            filesystem,
        }
    }

    /// Publish `request.source_dir` and return the uploaded manifest
    pub async fn publish(&self, request: &PublishRequest) -> ShelfResult<Manifest> {
        request.validate()?;

        let manifest_at = manifest_address(&request.remote_prefix, &request.name, &request.version);
        self.storage.download(&manifest_at, Expect::Absent).await?;

        let filesystem = Arc::clone(&self.filesystem);
        let source_dir = request.source_dir.clone();
        let compression = request.compression;
        let built = tokio::task::spawn_blocking(move || {
            build_package(filesystem.as_ref(), &source_dir, compression)
        })
        .await
        .map_err(|e| ShelfError::Task(format!("build task failed: {}", e)))??;

        if built.archive.contents.is_empty() {
            return Err(ShelfError::Validation(format!(
                "Nothing to publish: {} contains no files",
                request.source_dir.display()
            )));
        }

        let manifest = Manifest {
            name: request.name.clone(),
            version: request.version.clone(),
            archive: built.archive,
        };

        let archive_at = artifact_address(
            &request.remote_prefix,
            &request.name,
            &request.version,
            &manifest.archive.filename,
        );
        tracing::info!(address = %archive_at, size = manifest.archive.size, "uploading archive");
        self.storage
            .upload(&UploadRequest {
                address: archive_at,
                body: UploadBody::File(built.path.to_path_buf()),
                size: manifest.archive.size,
                content_type: compression.content_type().to_string(),
                checksum: manifest.archive.checksum,
            })
            .await?;

        // The manifest goes last so it never points at a missing archive
        let encoded = manifest.encode()?;
        tracing::info!(address = %manifest_at, "uploading manifest");
        self.storage
            .upload(&UploadRequest {
                address: manifest_at,
                size: encoded.len() as u64,
                checksum: checksum_bytes(&encoded),
                body: UploadBody::Bytes(encoded),
                content_type: MANIFEST_CONTENT_TYPE.to_string(),
            })
            .await?;

        tracing::info!(
            package = %manifest.name,
            version = %manifest.version,
            files = manifest.archive.contents.len(),
            "published"
        );
        Ok(manifest)
    }
}
