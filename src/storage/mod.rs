//! Remote object storage.
//!
//! Backends implement [`RemoteStorage`](crate::di::RemoteStorage) for one
//! or more address schemes, [`SchemeRouter`] picks one per call, and
//! [`RetryStorage`] wraps the result with bounded retry.

pub mod address;
pub mod http;
pub mod local;
pub mod memory;
pub mod retry;
pub mod router;

pub use address::{artifact_address, manifest_address, RemoteAddress};
pub use http::HttpStorage;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use retry::{RetryPolicy, RetryStorage};
pub use router::SchemeRouter;
