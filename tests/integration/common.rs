//! Common utilities for integration tests

use assert_cmd::Command;
use assert_fs::{prelude::*, TempDir};
use shelf::core::{CompressionAlgorithm, Manifest};
use shelf::di::{FileSystem, RemoteStorage};
use shelf::fs::LocalFileSystem;
use shelf::package::{PublishRequest, Publisher};
use shelf::resolver::Dependency;
use shelf::storage::RemoteAddress;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Isolated environment: a Shelf home, a remote directory and a project
pub struct TestContext {
    pub temp: TempDir,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        temp.child("home")
            .child("config.yaml")
            .write_str("max_retry: 0\nretry_backoff_secs: 0\n")
            .unwrap();
        temp.child("remote").create_dir_all().unwrap();
        temp.child("project").create_dir_all().unwrap();
        Self { temp }
    }

    /// `shelf` run from the project directory with an isolated home
    pub fn shelf(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("shelf").unwrap();
        cmd.current_dir(self.project());
        cmd.env("SHELF_HOME", self.temp.child("home").path());
        cmd.env("RUST_LOG", "warn");
        cmd
    }

    pub fn project(&self) -> PathBuf {
        self.temp.child("project").to_path_buf()
    }

    /// `file://` prefix pointing at the remote directory
    pub fn remote(&self) -> RemoteAddress {
        file_prefix(self.temp.child("remote").path())
    }

    /// Create a source tree under `sources/<name>` from `(path, content)` pairs
    pub fn source(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.temp.child("sources").child(name);
        for (path, content) in files {
            dir.child(path).write_str(content).unwrap();
        }
        dir.to_path_buf()
    }

    pub fn write_listing(&self, content: &str) {
        self.temp
            .child("project")
            .child("shelf.yaml")
            .write_str(content)
            .unwrap();
    }
}

pub fn file_prefix(dir: &Path) -> RemoteAddress {
    RemoteAddress::parse(&format!("file://{}", dir.display())).unwrap()
}

pub fn filesystem() -> Arc<dyn FileSystem> {
    Arc::new(LocalFileSystem::new())
}

pub async fn publish(
    storage: Arc<dyn RemoteStorage>,
    prefix: &RemoteAddress,
    name: &str,
    version: &str,
    source: &Path,
    compression: CompressionAlgorithm,
) -> Manifest {
    Publisher::new(storage, filesystem())
        .publish(&PublishRequest {
            name: name.to_string(),
            version: version.to_string(),
            source_dir: source.to_path_buf(),
            remote_prefix: prefix.clone(),
            compression,
        })
        .await
        .unwrap()
}

pub fn dependency(name: &str, version: &str, remote: &RemoteAddress, local: &Path) -> Dependency {
    Dependency {
        name: name.to_string(),
        version: version.to_string(),
        remote: remote.clone(),
        local: local.to_path_buf(),
    }
}
