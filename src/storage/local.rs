//! `file://` storage: objects are files under a directory tree.

use crate::core::{ShelfError, ShelfResult};
use crate::di::traits::{Expect, RemoteStorage, UploadBody, UploadRequest};
use crate::package::checksum::checksum_bytes;
use crate::storage::address::RemoteAddress;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stores objects on a locally mounted filesystem.
///
/// `file:///srv/packages/a/1/manifest.json` maps to the path
/// `/srv/packages/a/1/manifest.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn object_path(address: &RemoteAddress) -> PathBuf {
        PathBuf::from(address.location())
    }
}

#[async_trait]
impl RemoteStorage for LocalStorage {
    async fn upload(&self, request: &UploadRequest) -> ShelfResult<()> {
        let data = match &request.body {
            UploadBody::Bytes(bytes) => bytes.clone(),
            UploadBody::File(path) => tokio::fs::read(path).await?,
        };
        verify_body(request, &data)?;

        let target = Self::object_path(&request.address);
        tokio::task::spawn_blocking(move || store(&target, &data))
            .await
            .map_err(|e| ShelfError::Task(format!("upload task failed: {}", e)))??;

        tracing::debug!(address = %request.address, size = request.size, "stored object");
        Ok(())
    }

    async fn download(&self, address: &RemoteAddress, expect: Expect) -> ShelfResult<Vec<u8>> {
        let path = Self::object_path(address);
        match (tokio::fs::read(&path).await, expect) {
            (Ok(data), Expect::Present) => Ok(data),
            (Ok(_), Expect::Absent) => Err(ShelfError::AlreadyExists {
                address: address.to_string(),
            }),
            (Err(e), Expect::Present) if e.kind() == ErrorKind::NotFound => {
                Err(ShelfError::NotFound {
                    address: address.to_string(),
                })
            }
            (Err(e), Expect::Absent) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            (Err(e), _) => Err(e.into()),
        }
    }
}

/// Reject a body that does not match the size and digest it was announced with
pub(crate) fn verify_body(request: &UploadRequest, data: &[u8]) -> ShelfResult<()> {
    if data.len() as u64 != request.size {
        return Err(ShelfError::Transport {
            address: request.address.to_string(),
            reason: format!(
                "body is {} bytes, expected {}",
                data.len(),
                request.size
            ),
        });
    }

    let actual = checksum_bytes(data);
    if actual != request.checksum {
        return Err(ShelfError::Transport {
            address: request.address.to_string(),
            reason: format!(
                "body checksum {} does not match {}",
                actual, request.checksum
            ),
        });
    }

    Ok(())
}

fn store(target: &Path, data: &[u8]) -> ShelfResult<()> {
    let parent = target
        .parent()
        .ok_or_else(|| ShelfError::Path(format!("Invalid object path: {}", target.display())))?;
    std::fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut staged, data)?;
    staged
        .persist(target)
        .map_err(|e| ShelfError::Io(e.error))?;
    Ok(())
}
