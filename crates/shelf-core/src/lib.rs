//! Core types shared by the Shelf library and binary.
//!
//! Holds the manifest data model and wire codec, the error taxonomy, and the
//! path conventions used to find configuration and local manifests.

pub mod core;
pub mod package;

pub use crate::core::error::{IntegrityError, ShelfError, ShelfResult};
pub use crate::package::manifest::{
    Archive, ArchiveItem, Checksum, CompressionAlgorithm, Manifest,
};
