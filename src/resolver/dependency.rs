use crate::core::path::local_manifest_path;
use crate::core::{ShelfError, ShelfResult};
use crate::storage::address::{manifest_address, RemoteAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A package version that must be installed in a local directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    /// Prefix the package was published under
    pub remote: RemoteAddress,
    /// Installation root
    pub local: PathBuf,
}

impl Dependency {
    pub fn manifest_address(&self) -> RemoteAddress {
        manifest_address(&self.remote, &self.name, &self.version)
    }

    /// Where the installed manifest for this dependency is recorded
    pub fn manifest_path(&self) -> PathBuf {
        local_manifest_path(&self.local, &self.name)
    }
}

/// The flat dependency list read from `shelf.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyListing {
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl DependencyListing {
    pub fn new(dependencies: Vec<Dependency>) -> Self {
        Self { dependencies }
    }

    /// Parse and validate a listing. Relative `local` paths are kept as written.
    pub fn from_yaml(content: &str) -> ShelfResult<Self> {
        let listing: DependencyListing = serde_yaml::from_str(content)
            .map_err(|e| ShelfError::Validation(e.to_string()))?;
        listing.validate()?;
        Ok(listing)
    }

    /// Load a listing file, resolving relative `local` paths against its directory
    pub fn load(path: &Path) -> ShelfResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut listing: DependencyListing = serde_yaml::from_str(&content)
            .map_err(|e| ShelfError::Validation(format!("{}: {}", path.display(), e)))?;

        if let Some(root) = path.parent() {
            for dependency in &mut listing.dependencies {
                if dependency.local.is_relative() {
                    dependency.local = root.join(&dependency.local);
                }
            }
        }

        listing.validate()?;
        Ok(listing)
    }

    /// Check every field is populated and no two entries install the same
    /// package name into the same local directory.
    ///
    /// Entries sharing a directory under different names are fine: each keeps
    /// its own manifest under `<local>/.shelf/<name>.manifest.json`.
    pub fn validate(&self) -> ShelfResult<()> {
        let mut seen: HashMap<(&Path, &str), usize> = HashMap::new();

        for (index, dependency) in self.dependencies.iter().enumerate() {
            let entry = index + 1;
            for (field, value) in [("name", &dependency.name), ("version", &dependency.version)]
            {
                let value = value.trim();
                if value.is_empty() {
                    return Err(ShelfError::Validation(format!(
                        "dependency #{} has an empty {}",
                        entry, field
                    )));
                }
                if value == "." || value == ".." || value.contains('/') {
                    return Err(ShelfError::Validation(format!(
                        "dependency #{} has an invalid {} '{}'",
                        entry, field, value
                    )));
                }
            }
            if dependency.local.as_os_str().is_empty() {
                return Err(ShelfError::Validation(format!(
                    "dependency #{} ({}) has an empty local directory",
                    entry, dependency.name
                )));
            }

            let key = (dependency.local.as_path(), dependency.name.trim());
            if let Some(first) = seen.insert(key, entry) {
                return Err(ShelfError::Validation(format!(
                    "dependencies #{} and #{} both install '{}' into {}",
                    first,
                    entry,
                    dependency.name,
                    dependency.local.display()
                )));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
