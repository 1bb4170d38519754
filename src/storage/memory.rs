//! `memory://` storage: an in-process object store.
//!
//! Objects live as long as the [`MemoryStorage`] value. Calls are counted, and
//! failures can be injected per address prefix, which makes this the backend
//! of choice for exercising the resolver and orchestrator.

use crate::core::{ShelfError, ShelfResult};
use crate::di::traits::{Expect, RemoteStorage, UploadBody, UploadRequest};
use crate::storage::address::RemoteAddress;
use crate::storage::local::verify_body;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    /// Address prefix -> remaining injected failures
    failures: Mutex<Vec<(String, usize)>>,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upload` calls so far, failed ones included
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Number of `download` calls so far, failed ones included
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Make the next `times` calls touching an address under `prefix` fail
    /// with a transport error
    pub fn fail_next(&self, prefix: &str, times: usize) {
        lock(&self.failures).push((prefix.to_string(), times));
    }

    /// Make every call touching an address under `prefix` fail
    pub fn fail_always(&self, prefix: &str) {
        self.fail_next(prefix, usize::MAX);
    }

    pub fn contains(&self, address: &RemoteAddress) -> bool {
        lock(&self.objects).contains_key(address.as_str())
    }

    /// Replace an object's bytes without any verification
    pub fn put_raw(&self, address: &RemoteAddress, data: Vec<u8>) {
        lock(&self.objects).insert(address.to_string(), data);
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    fn injected_failure(&self, address: &RemoteAddress) -> ShelfResult<()> {
        let mut failures = lock(&self.failures);
        let hit = failures
            .iter_mut()
            .find(|(prefix, remaining)| *remaining > 0 && address.as_str().starts_with(prefix));

        match hit {
            Some((_, remaining)) => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(ShelfError::Transport {
                    address: address.to_string(),
                    reason: "injected failure".to_string(),
                })
            }
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves the map itself intact
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    async fn upload(&self, request: &UploadRequest) -> ShelfResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(&request.address)?;

        let data = match &request.body {
            UploadBody::Bytes(bytes) => bytes.clone(),
            UploadBody::File(path) => tokio::fs::read(path).await?,
        };
        verify_body(request, &data)?;

        lock(&self.objects).insert(request.address.to_string(), data);
        Ok(())
    }

    async fn download(&self, address: &RemoteAddress, expect: Expect) -> ShelfResult<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(address)?;

        let found = lock(&self.objects).get(address.as_str()).cloned();
        match (found, expect) {
            (Some(data), Expect::Present) => Ok(data),
            (Some(_), Expect::Absent) => Err(ShelfError::AlreadyExists {
                address: address.to_string(),
            }),
            (None, Expect::Present) => Err(ShelfError::NotFound {
                address: address.to_string(),
            }),
            (None, Expect::Absent) => Ok(Vec::new()),
        }
    }
}
