//! Mock implementations of service traits for testing

use super::traits::ConfigProvider;
use crate::core::CompressionAlgorithm;
use crate::storage::RetryPolicy;
use std::time::Duration;

/// Mock configuration provider for testing
///
/// Defaults to no retries and no backoff so failures surface immediately.
///
/// # Example
///
/// ```
/// use shelf::di::mocks::MockConfigProvider;
/// use shelf::di::ConfigProvider;
///
/// let config = MockConfigProvider {
///     quick_verify: true,
///     ..Default::default()
/// };
///
/// assert!(config.quick_verify());
/// ```
#[derive(Debug, Clone)]
pub struct MockConfigProvider {
    pub max_retry: u32,
    pub backoff: Duration,
    pub max_concurrent: usize,
    pub quick_verify: bool,
    pub compression: CompressionAlgorithm,
    pub http_timeout: Duration,
}

impl Default for MockConfigProvider {
    fn default() -> Self {
        Self {
            max_retry: 0,
            backoff: Duration::ZERO,
            max_concurrent: 4,
            quick_verify: false,
            compression: CompressionAlgorithm::Uncompressed,
            http_timeout: Duration::from_secs(5),
        }
    }
}

impl ConfigProvider for MockConfigProvider {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry, self.backoff)
    }

    fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    fn quick_verify(&self) -> bool {
        self.quick_verify
    }

    fn compression(&self) -> CompressionAlgorithm {
        self.compression
    }

    fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}
