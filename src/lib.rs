//! Shelf: versioned, checksummed package archives in object storage
//!
//! This crate provides the main Shelf library, re-exporting the data model and
//! error types from `shelf-core` and organizing the publishing and
//! installation machinery around them.

pub use shelf_core::{
    Archive, ArchiveItem, Checksum, CompressionAlgorithm, IntegrityError, Manifest, ShelfError,
    ShelfResult,
};

/// Core types re-exported from shelf-core.
pub mod core {
    pub use shelf_core::core::error::{IntegrityError, ShelfError, ShelfResult};
    pub use shelf_core::package::manifest::{
        Archive, ArchiveItem, Checksum, CompressionAlgorithm, Manifest, MANIFEST_CONTENT_TYPE,
        MANIFEST_FILENAME,
    };

    /// Path conventions re-exported from shelf-core.
    pub mod path {
        pub use shelf_core::core::path::*;
    }
}

/// Configuration management.
pub mod config;

/// Dependency injection infrastructure.
pub mod di;

/// Local filesystem access.
pub mod fs;

/// Remote object storage backends and the retry client.
pub mod storage;

/// Package building, verification, installation and publishing.
pub mod package;

/// Dependency listings, per-dependency resolution and orchestration.
pub mod resolver;
