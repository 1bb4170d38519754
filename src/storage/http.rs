//! `http://` and `https://` storage: objects are PUT and GET by URL.
//!
//! The address is used as the URL verbatim. Uploads carry `Content-MD5`
//! (base64 of the binary digest) so servers that check it reject corrupted
//! bodies.

use crate::core::{ShelfError, ShelfResult};
use crate::di::traits::{Expect, RemoteStorage, UploadBody, UploadRequest};
use crate::storage::address::RemoteAddress;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, StatusCode};
use std::time::Duration;
use tokio_util::io::ReaderStream;

const CONTENT_MD5: &str = "Content-MD5";

pub struct HttpStorage {
    client: Client,
}

impl HttpStorage {
    pub fn new(timeout: Duration) -> ShelfResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn body(request: &UploadRequest) -> ShelfResult<Body> {
        Ok(match &request.body {
            UploadBody::Bytes(bytes) => Body::from(bytes.clone()),
            UploadBody::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                Body::wrap_stream(ReaderStream::new(file))
            }
        })
    }
}

fn unexpected_status(address: &RemoteAddress, status: StatusCode) -> ShelfError {
    ShelfError::Transport {
        address: address.to_string(),
        reason: format!("server responded with {}", status),
    }
}

#[async_trait]
impl RemoteStorage for HttpStorage {
    async fn upload(&self, request: &UploadRequest) -> ShelfResult<()> {
        let body = Self::body(request).await?;

        let response = self
            .client
            .put(request.address.as_str())
            .header(CONTENT_TYPE, request.content_type.as_str())
            .header(CONTENT_LENGTH, request.size)
            .header(CONTENT_MD5, request.checksum.to_base64())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(unexpected_status(&request.address, status));
        }

        tracing::debug!(address = %request.address, size = request.size, "uploaded object");
        Ok(())
    }

    async fn download(&self, address: &RemoteAddress, expect: Expect) -> ShelfResult<Vec<u8>> {
        let response = self.client.get(address.as_str()).send().await?;
        let status = response.status();

        match expect {
            Expect::Present if status.is_success() => Ok(response.bytes().await?.to_vec()),
            Expect::Present if status == StatusCode::NOT_FOUND => Err(ShelfError::NotFound {
                address: address.to_string(),
            }),
            Expect::Absent if status == StatusCode::NOT_FOUND => Ok(Vec::new()),
            Expect::Absent if status.is_success() => Err(ShelfError::AlreadyExists {
                address: address.to_string(),
            }),
            _ => Err(unexpected_status(address, status)),
        }
    }
}
