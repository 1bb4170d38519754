//! Dependency injection infrastructure for Shelf
//!
//! Remote storage, local file access and configuration are reached through
//! traits, so the resolver and orchestrator can be driven by in-memory
//! implementations in tests.
//!
//! # Example (Production)
//! ```no_run
//! use shelf::di::ServiceContainer;
//!
//! # fn example() -> shelf::core::ShelfResult<()> {
//! let container = ServiceContainer::new()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example (Testing)
//! ```
//! use shelf::di::{mocks::MockConfigProvider, ServiceContainer};
//! use shelf::fs::LocalFileSystem;
//! use shelf::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! let container = ServiceContainer::with_providers(
//!     Arc::new(MockConfigProvider::default()),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(LocalFileSystem::new()),
//! );
//! ```

pub mod container;
pub mod mocks;
pub mod traits;

// Re-export key types
pub use container::ServiceContainer;
pub use traits::{
    ConfigProvider, Expect, FileInfo, FileSystem, RemoteStorage, UploadBody, UploadRequest,
};
