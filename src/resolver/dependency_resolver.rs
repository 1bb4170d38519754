//! Per-dependency resolution.
//!
//! For one dependency the resolver reads the locally recorded manifest and
//! decides:
//!
//! - nothing recorded: install
//! - record does not decode: fail, the user has to remove it by hand
//! - record decodes and matches (name, version, integrity chain): nothing to do
//! - record decodes but anything differs: delete what it lists, then install
//!
//! All state lives on disk and in remote storage, so resolving is a single
//! pass with no recovery beyond "delete everything listed, then install again".
//!
//! Packages sharing an installation root must not ship the same path: an
//! install that would overwrite a file another package recorded there fails
//! with [`ShelfError::PathConflict`]. Callers resolve dependencies sharing a
//! root one at a time (see the orchestrator).

use crate::core::path::{local_manifest_path, native_path};
use crate::core::{IntegrityError, Manifest, ShelfError, ShelfResult};
use crate::di::traits::{FileSystem, RemoteStorage};
use crate::package::installer::{
    blocking, load_local_manifest, read_other_manifests, InstallRequest, PackageInstaller,
};
use crate::package::integrity::{standard_chain, IntegrityCheck};
use crate::resolver::dependency::Dependency;
use crate::storage::address::artifact_address;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What resolving one dependency did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing was recorded locally; the package was installed
    Installed,
    /// The recorded install was stale or damaged; it was removed and installed again
    Reinstalled,
    /// Already installed correctly; nothing was downloaded or deleted
    UpToDate,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resolution::Installed => "installed",
            Resolution::Reinstalled => "reinstalled",
            Resolution::UpToDate => "up to date",
        })
    }
}

pub struct DependencyResolver {
    installer: PackageInstaller,
    filesystem: Arc<dyn FileSystem>,
    quick_verify: bool,
}

impl DependencyResolver {
    pub fn new(
        storage: Arc<dyn RemoteStorage>,
        filesystem: Arc<dyn FileSystem>,
        quick_verify: bool,
    ) -> Self {
        Self {
            installer: PackageInstaller::new(storage),
            filesystem,
            quick_verify,
        }
    }

    /// Bring `dependency` to its declared state
    pub async fn resolve(&self, dependency: &Dependency) -> ShelfResult<Resolution> {
        let Some(recorded) = load_local_manifest(&dependency.local, &dependency.name).await? else {
            tracing::info!(package = %dependency.name, version = %dependency.version, "installing");
            self.install(dependency).await?;
            return Ok(Resolution::Installed);
        };

        match self.check(dependency, recorded.clone()).await {
            Ok(()) => {
                tracing::debug!(package = %dependency.name, version = %dependency.version, "up to date");
                Ok(Resolution::UpToDate)
            }
            Err(ShelfError::Integrity(reason)) => {
                tracing::info!(
                    package = %dependency.name,
                    version = %dependency.version,
                    reason = %reason,
                    "reinstalling"
                );
                self.uninstall(dependency, &recorded).await?;
                self.install(dependency).await?;
                Ok(Resolution::Reinstalled)
            }
            Err(e) => Err(e),
        }
    }

    /// Check the installed state of `dependency` without touching remote storage
    ///
    /// A dependency with no recorded manifest fails with
    /// [`IntegrityError::FileNotFound`] naming the manifest path.
    pub async fn verify(&self, dependency: &Dependency) -> ShelfResult<()> {
        let recorded = load_local_manifest(&dependency.local, &dependency.name)
            .await?
            .ok_or_else(|| IntegrityError::FileNotFound {
                path: dependency.manifest_path().display().to_string(),
            })?;
        self.check(dependency, recorded).await
    }

    async fn check(&self, dependency: &Dependency, recorded: Manifest) -> ShelfResult<()> {
        if recorded.name != dependency.name {
            return Err(IntegrityError::NameMismatch {
                expected: dependency.name.clone(),
                actual: recorded.name,
            }
            .into());
        }

        let chain = standard_chain(
            Arc::clone(&self.filesystem),
            &dependency.version,
            self.quick_verify,
        );
        let local = dependency.local.clone();
        tokio::task::spawn_blocking(move || chain.verify(&recorded, &local))
            .await
            .map_err(|e| ShelfError::Task(format!("integrity check failed to run: {}", e)))?
    }

    async fn install(&self, dependency: &Dependency) -> ShelfResult<()> {
        let manifest = self
            .installer
            .install_manifest(&InstallRequest::new(
                dependency.manifest_address(),
                &dependency.local,
            ))
            .await?;

        if manifest.name != dependency.name {
            return Err(IntegrityError::NameMismatch {
                expected: dependency.name.clone(),
                actual: manifest.name,
            }
            .into());
        }
        if manifest.version != dependency.version {
            return Err(IntegrityError::VersionMismatch {
                expected: dependency.version.clone(),
                actual: manifest.version,
            }
            .into());
        }

        let local = dependency.local.clone();
        let package = manifest.clone();
        blocking(move || check_conflicts(&local, &package)).await?;

        let archive_at = artifact_address(
            &dependency.remote,
            &dependency.name,
            &dependency.version,
            &manifest.archive.filename,
        );
        self.installer
            .install_package(&manifest, &InstallRequest::new(archive_at, &dependency.local))
            .await
    }

    /// Delete every file `recorded` lists, then the recorded manifest itself
    ///
    /// Files that are already gone are skipped. Directories the deletions
    /// leave empty are removed too, up to but not including `dependency.local`.
    pub async fn uninstall(&self, dependency: &Dependency, recorded: &Manifest) -> ShelfResult<()> {
        let filesystem = Arc::clone(&self.filesystem);
        let local = dependency.local.clone();
        let name = dependency.name.clone();
        let recorded = recorded.clone();

        let pruned = blocking(move || {
            remove_installed(filesystem.as_ref(), &local, &name, &recorded)
        })
        .await?;

        tracing::debug!(
            package = %dependency.name,
            pruned_dirs = pruned,
            "uninstalled"
        );
        Ok(())
    }
}

/// Returns how many emptied directories were removed
fn remove_installed(
    filesystem: &dyn FileSystem,
    local: &Path,
    name: &str,
    recorded: &Manifest,
) -> ShelfResult<usize> {
    let mut parents = BTreeSet::new();
    for item in &recorded.archive.contents {
        let path = contained_path(local, &item.path)?;
        filesystem.remove(&path)?;
        parents.extend(
            path.ancestors()
                .skip(1)
                .take_while(|ancestor| *ancestor != local)
                .map(Path::to_path_buf),
        );
    }
    filesystem.remove(&local_manifest_path(local, name))?;

    let mut parents: Vec<PathBuf> = parents.into_iter().collect();
    parents.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));

    let mut pruned = 0;
    for dir in parents {
        if filesystem.remove_empty_dir(&dir)? {
            pruned += 1;
        }
    }
    Ok(pruned)
}

/// Fail if `incoming` ships a path another package recorded under `local`
///
/// A path also conflicts when one side uses it as a directory and the other
/// as a file.
fn check_conflicts(local: &Path, incoming: &Manifest) -> ShelfResult<()> {
    for other in read_other_manifests(local, &incoming.name)? {
        for theirs in &other.archive.contents {
            let clash = incoming
                .archive
                .contents
                .iter()
                .find(|ours| paths_overlap(&ours.path, &theirs.path));
            if let Some(ours) = clash {
                return Err(ShelfError::PathConflict {
                    package: incoming.name.clone(),
                    owner: other.name.clone(),
                    path: ours.path.clone(),
                    local: local.to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

fn paths_overlap(a: &str, b: &str) -> bool {
    fn nested(inner: &str, outer: &str) -> bool {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with('/'))
    }
    a == b || nested(a, b) || nested(b, a)
}

/// `local/path`, refusing recorded paths that would leave `local`
fn contained_path(local: &Path, archive_path: &str) -> ShelfResult<PathBuf> {
    if archive_path.starts_with('/') || archive_path.split('/').any(|segment| segment == "..") {
        return Err(ShelfError::Path(format!(
            "Refusing to delete '{}' outside {}",
            archive_path,
            local.display()
        )));
    }
    Ok(native_path(local, archive_path))
}
