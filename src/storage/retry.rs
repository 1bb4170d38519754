use crate::core::ShelfResult;
use crate::di::traits::{Expect, RemoteStorage, UploadRequest};
use crate::storage::address::RemoteAddress;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retry: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retry: u32, backoff: Duration) -> Self {
        Self { max_retry, backoff }
    }

    /// Total attempts, first one included
    pub fn attempts(&self) -> u32 {
        self.max_retry.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(3))
    }
}

/// Adds retries to any [`RemoteStorage`]
///
/// Upload and download are retried alike. Only transient errors are retried
/// (see [`ShelfError::is_transient`](crate::core::ShelfError::is_transient)).
/// When attempts run out, the last error is returned as the inner storage
/// produced it.
pub struct RetryStorage {
    inner: Arc<dyn RemoteStorage>,
    policy: RetryPolicy,
}

impl RetryStorage {
    pub fn new(inner: Arc<dyn RemoteStorage>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn run<T, F, Fut>(&self, operation: &str, address: &RemoteAddress, mut call: F) -> ShelfResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ShelfResult<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt <= self.policy.max_retry => {
                    tracing::warn!(
                        operation,
                        address = %address,
                        attempt,
                        attempts = self.policy.attempts(),
                        error = %e,
                        "remote call failed, retrying in {}s",
                        self.policy.backoff.as_secs_f64()
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl RemoteStorage for RetryStorage {
    async fn upload(&self, request: &UploadRequest) -> ShelfResult<()> {
        self.run("upload", &request.address, || self.inner.upload(request))
            .await
    }

    async fn download(&self, address: &RemoteAddress, expect: Expect) -> ShelfResult<Vec<u8>> {
        self.run("download", address, || self.inner.download(address, expect))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShelfError;
    use crate::di::traits::{MockRemoteStorage, UploadBody};
    use crate::package::checksum::checksum_bytes;
    use tokio::time::Instant;

    fn address() -> RemoteAddress {
        RemoteAddress::parse("memory://packages/tool/1.0.0/archive.tar.zst").unwrap()
    }

    fn request() -> UploadRequest {
        UploadRequest {
            address: address(),
            body: UploadBody::Bytes(b"data".to_vec()),
            size: 4,
            content_type: "application/octet-stream".to_string(),
            checksum: checksum_bytes(b"data"),
        }
    }

    fn transport_error() -> ShelfError {
        ShelfError::Transport {
            address: address().to_string(),
            reason: "connection reset".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_exhausts_retries() {
        let mut inner = MockRemoteStorage::new();
        inner
            .expect_upload()
            .times(5)
            .returning(|_| Err(transport_error()));

        let storage = RetryStorage::new(Arc::new(inner), RetryPolicy::default());
        let start = Instant::now();
        let err = storage.upload(&request()).await.unwrap_err();

        // Four 3s pauses between five attempts
        assert_eq!(start.elapsed(), Duration::from_secs(12));
        assert!(matches!(
            err,
            ShelfError::Transport { reason, .. } if reason == "connection reset"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_succeeds_without_sleeping() {
        let mut inner = MockRemoteStorage::new();
        inner.expect_upload().times(1).returning(|_| Ok(()));

        let storage = RetryStorage::new(Arc::new(inner), RetryPolicy::default());
        let start = Instant::now();
        storage.upload(&request()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_recovers_after_transient_failures() {
        let mut inner = MockRemoteStorage::new();
        let mut calls = 0;
        inner.expect_download().times(3).returning(move |_, _| {
            calls += 1;
            if calls < 3 {
                Err(transport_error())
            } else {
                Ok(b"manifest".to_vec())
            }
        });

        let storage = RetryStorage::new(Arc::new(inner), RetryPolicy::default());
        let start = Instant::now();
        let data = storage.download(&address(), Expect::Present).await.unwrap();

        assert_eq!(data, b"manifest");
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_definitive_answers_are_not_retried() {
        let mut inner = MockRemoteStorage::new();
        inner.expect_download().times(1).returning(|address, _| {
            Err(ShelfError::NotFound {
                address: address.to_string(),
            })
        });
        inner.expect_upload().times(1).returning(|_| {
            Err(ShelfError::AlreadyExists {
                address: address().to_string(),
            })
        });

        let storage = RetryStorage::new(Arc::new(inner), RetryPolicy::default());
        assert!(matches!(
            storage.download(&address(), Expect::Present).await,
            Err(ShelfError::NotFound { .. })
        ));
        assert!(matches!(
            storage.upload(&request()).await,
            Err(ShelfError::AlreadyExists { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_one_attempt() {
        let mut inner = MockRemoteStorage::new();
        inner
            .expect_upload()
            .times(1)
            .returning(|_| Err(transport_error()));

        let storage = RetryStorage::new(
            Arc::new(inner),
            RetryPolicy::new(0, Duration::from_secs(3)),
        );
        assert!(storage.upload(&request()).await.is_err());
        assert_eq!(storage.policy().attempts(), 1);
    }
}
