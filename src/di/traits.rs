//! Trait definitions for dependency injection

use crate::core::{Checksum, CompressionAlgorithm, ShelfResult};
use crate::storage::address::RemoteAddress;
use crate::storage::RetryPolicy;
use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Trait for configuration access
///
/// Abstracts configuration so tests can run without touching the user's
/// config file.
pub trait ConfigProvider: Send + Sync {
    /// Retry and backoff applied to every remote call
    fn retry_policy(&self) -> RetryPolicy;

    /// Upper bound on concurrently resolved dependencies
    fn max_concurrent(&self) -> usize;

    /// Whether integrity checks skip content hashing
    fn quick_verify(&self) -> bool;

    /// Default compression for published archives
    fn compression(&self) -> CompressionAlgorithm;

    /// Timeout for a single HTTP request
    fn http_timeout(&self) -> Duration;
}

/// Outcome a caller expects from a download.
///
/// The same download capability answers both "fetch this object" and
/// "confirm this object does not exist yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// The object must exist; a missing object is [`ShelfError::NotFound`](crate::core::ShelfError::NotFound).
    Present,
    /// The object must not exist; success yields an empty body and an existing
    /// object is [`ShelfError::AlreadyExists`](crate::core::ShelfError::AlreadyExists).
    Absent,
}

/// Where the bytes of an upload come from.
///
/// Either variant can be read more than once, which is what lets the retry
/// client replay an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadBody {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// A single object to store remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub address: RemoteAddress,
    pub body: UploadBody,
    pub size: u64,
    pub content_type: String,
    pub checksum: Checksum,
}

/// Trait for remote object storage
///
/// Implementations own the wire protocol for one or more address schemes.
/// They must not retry or sleep; that belongs to
/// [`RetryStorage`](crate::storage::RetryStorage).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Store `request.body` at `request.address`
    async fn upload(&self, request: &UploadRequest) -> ShelfResult<()>;

    /// Fetch the object at `address`, interpreting absence according to `expect`
    async fn download(&self, address: &RemoteAddress, expect: Expect) -> ShelfResult<Vec<u8>>;
}

/// A regular file found under a listed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Root-relative, `/`-separated path
    pub path: String,
    pub size: u64,
    pub modified: SystemTime,
}

/// Trait for local file access
///
/// Covers what the package builder, integrity checks and uninstaller need:
/// a sorted listing, sequential reads and deletion of files and emptied
/// directories.
pub trait FileSystem: Send + Sync {
    /// List every regular file under `root` in lexical path order.
    ///
    /// A missing root lists as empty.
    fn list(&self, root: &Path) -> ShelfResult<Vec<FileInfo>>;

    /// Open a file for reading
    fn open(&self, path: &Path) -> ShelfResult<Box<dyn Read + Send>>;

    /// Delete a file. Deleting a file that does not exist succeeds.
    fn remove(&self, path: &Path) -> ShelfResult<()>;

    /// Delete `path` if it is an empty directory.
    ///
    /// Returns whether it was removed; a missing or non-empty directory is
    /// left alone.
    fn remove_empty_dir(&self, path: &Path) -> ShelfResult<bool>;
}
