//! Published package description and its JSON wire format.
//!
//! A [`Manifest`] is stored next to its archive in remote storage and copied
//! into the installation root after a successful install. Checksums are raw
//! MD5 digests; on the wire they are base64 strings so that decoding yields
//! the exact bytes that were encoded.

use crate::core::error::{ShelfError, ShelfResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Filename of the manifest object stored next to every archive.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Content type used when uploading a manifest.
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// A 16-byte MD5 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checksum([u8; 16]);

impl Checksum {
    pub const LEN: usize = 16;

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Build a checksum from a slice, returning `None` unless it is exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Base64 form, as sent in `Content-MD5` headers and the wire format.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> Option<Self> {
        let bytes = STANDARD.decode(encoded).ok()?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).ok_or_else(|| {
            D::Error::custom(format!(
                "invalid md5 checksum '{}': expected base64 of {} bytes",
                encoded,
                Self::LEN
            ))
        })
    }
}

/// Compression applied to a package archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// tar stream compressed with zstd
    #[default]
    Zstd,
    /// tar stream compressed with gzip
    Gzip,
    /// zip archive (deflate per entry)
    Zip,
    /// plain tar stream
    #[serde(rename = "none")]
    Uncompressed,
}

impl CompressionAlgorithm {
    pub const ALL: [CompressionAlgorithm; 4] = [
        CompressionAlgorithm::Zstd,
        CompressionAlgorithm::Gzip,
        CompressionAlgorithm::Zip,
        CompressionAlgorithm::Uncompressed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Zstd => "zstd",
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Zip => "zip",
            CompressionAlgorithm::Uncompressed => "none",
        }
    }

    /// Name of the archive object in remote storage.
    pub fn archive_filename(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Zstd => "archive.tar.zst",
            CompressionAlgorithm::Gzip => "archive.tar.gz",
            CompressionAlgorithm::Zip => "archive.zip",
            CompressionAlgorithm::Uncompressed => "archive.tar",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Zstd => "application/zstd",
            CompressionAlgorithm::Gzip => "application/gzip",
            CompressionAlgorithm::Zip => "application/zip",
            CompressionAlgorithm::Uncompressed => "application/x-tar",
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zstd" | "zst" => Ok(CompressionAlgorithm::Zstd),
            "gzip" | "gz" => Ok(CompressionAlgorithm::Gzip),
            "zip" => Ok(CompressionAlgorithm::Zip),
            "none" | "tar" => Ok(CompressionAlgorithm::Uncompressed),
            _ => Err(ShelfError::Config(format!(
                "Invalid compression algorithm '{}'. Must be one of: zstd, gzip, zip, none",
                s
            ))),
        }
    }
}

/// One archived file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveItem {
    /// Archive-relative, `/`-separated path.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    #[serde(rename = "md5_checksum")]
    pub checksum: Checksum,
}

/// The single archive belonging to a package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub filename: String,
    /// Exact number of bytes stored remotely (post-compression).
    pub size: u64,
    /// Digest of exactly those `size` bytes.
    #[serde(rename = "md5_checksum")]
    pub checksum: Checksum,
    /// One entry per archived file, in archival order.
    pub contents: Vec<ArchiveItem>,
    pub compression_algorithm: CompressionAlgorithm,
}

/// Identity of a publishable unit plus its archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "short_name")]
    pub name: String,
    pub version: String,
    pub archive: Archive,
}

impl Manifest {
    pub fn encode(&self) -> ShelfResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode a manifest, rejecting content lists that repeat a path.
    pub fn decode(bytes: &[u8]) -> ShelfResult<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;

        let mut seen = HashSet::with_capacity(manifest.archive.contents.len());
        for item in &manifest.archive.contents {
            if !seen.insert(item.path.as_str()) {
                return Err(ShelfError::Archive(format!(
                    "manifest for {} {} lists '{}' more than once",
                    manifest.name, manifest.version, item.path
                )));
            }
        }

        Ok(manifest)
    }

    /// Total uncompressed size of every archived file.
    pub fn installed_size(&self) -> u64 {
        self.archive.contents.iter().map(|item| item.size).sum()
    }
}
