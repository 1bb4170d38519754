use crate::core::{ShelfError, ShelfResult};
use crate::di::traits::{Expect, RemoteStorage, UploadRequest};
use crate::storage::address::RemoteAddress;
use crate::storage::http::HttpStorage;
use crate::storage::local::LocalStorage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Dispatches each call to the backend registered for the address scheme
#[derive(Default, Clone)]
pub struct SchemeRouter {
    backends: HashMap<String, Arc<dyn RemoteStorage>>,
}

impl SchemeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `file://`, `http://` and `https://`
    pub fn standard(http_timeout: Duration) -> ShelfResult<Self> {
        let http: Arc<dyn RemoteStorage> = Arc::new(HttpStorage::new(http_timeout)?);
        Ok(Self::new()
            .register("file", Arc::new(LocalStorage::new()))
            .register("http", http.clone())
            .register("https", http))
    }

    pub fn register(mut self, scheme: &str, backend: Arc<dyn RemoteStorage>) -> Self {
        self.backends.insert(scheme.to_ascii_lowercase(), backend);
        self
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    fn backend(&self, address: &RemoteAddress) -> ShelfResult<&Arc<dyn RemoteStorage>> {
        let scheme = address.scheme();
        self.backends.get(&scheme).ok_or_else(|| {
            ShelfError::Config(format!(
                "No storage backend for scheme '{}' in {} (supported: {})",
                scheme,
                address,
                self.schemes().join(", ")
            ))
        })
    }
}

#[async_trait]
impl RemoteStorage for SchemeRouter {
    async fn upload(&self, request: &UploadRequest) -> ShelfResult<()> {
        self.backend(&request.address)?.upload(request).await
    }

    async fn download(&self, address: &RemoteAddress, expect: Expect) -> ShelfResult<Vec<u8>> {
        self.backend(address)?.download(address, expect).await
    }
}
