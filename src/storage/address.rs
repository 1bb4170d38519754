//! Remote object addresses.
//!
//! An address is an opaque `scheme://location` string. The only operation the
//! rest of the crate performs on it is appending path segments.

use crate::core::{ShelfError, ShelfResult, MANIFEST_FILENAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteAddress(String);

impl RemoteAddress {
    /// Parse `scheme://location`.
    pub fn parse(address: &str) -> ShelfResult<Self> {
        let trimmed = address.trim();
        let (scheme, location) = trimmed.split_once("://").ok_or_else(|| {
            ShelfError::Validation(format!(
                "Remote address '{}' has no scheme (expected scheme://location)",
                address
            ))
        })?;

        let scheme_ok = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(ShelfError::Validation(format!(
                "Remote address '{}' has an invalid scheme '{}'",
                address, scheme
            )));
        }
        if location.trim_matches('/').is_empty() {
            return Err(ShelfError::Validation(format!(
                "Remote address '{}' has no location",
                address
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `://`, lowercased.
    pub fn scheme(&self) -> String {
        self.0
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// The part after `://`.
    pub fn location(&self) -> &str {
        self.0
            .split_once("://")
            .map(|(_, location)| location)
            .unwrap_or(&self.0)
    }

    /// Append one or more `/`-separated segments.
    pub fn join(&self, segment: &str) -> RemoteAddress {
        let base = self.0.trim_end_matches('/');
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            return RemoteAddress(base.to_string());
        }
        RemoteAddress(format!("{}/{}", base, segment))
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemoteAddress {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RemoteAddress {
    type Error = ShelfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RemoteAddress> for String {
    fn from(address: RemoteAddress) -> Self {
        address.0
    }
}

/// `prefix/name/version/filename`
pub fn artifact_address(
    prefix: &RemoteAddress,
    package_name: &str,
    package_version: &str,
    filename: &str,
) -> RemoteAddress {
    prefix
        .join(package_name)
        .join(package_version)
        .join(filename)
}

/// `prefix/name/version/manifest.json`
pub fn manifest_address(
    prefix: &RemoteAddress,
    package_name: &str,
    package_version: &str,
) -> RemoteAddress {
    artifact_address(prefix, package_name, package_version, MANIFEST_FILENAME)
}
