//! Publish then install through real storage backends

use super::common::{dependency, file_prefix, filesystem, publish, TestContext};
use shelf::core::{CompressionAlgorithm, Manifest, ShelfError};
use shelf::di::{Expect, RemoteStorage};
use shelf::resolver::{DependencyResolver, Resolution};
use shelf::storage::{
    manifest_address, LocalStorage, MemoryStorage, RemoteAddress, RetryPolicy, RetryStorage,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

const FILES: &[(&str, &str)] = &[
    ("a", "a"),
    ("bb", "bb"),
    ("sub/c", "ccc"),
    ("sub/deeper/d", "dddd"),
];

#[tokio::test]
async fn test_round_trip_through_file_storage_for_every_compression() {
    let ctx = TestContext::new();
    let source = ctx.source("tool", FILES);
    let storage: Arc<dyn RemoteStorage> = Arc::new(LocalStorage::new());
    let resolver = DependencyResolver::new(storage.clone(), filesystem(), false);

    for (index, compression) in CompressionAlgorithm::ALL.into_iter().enumerate() {
        let version = format!("1.0.{}", index);
        let manifest = publish(
            storage.clone(),
            &ctx.remote(),
            "tool",
            &version,
            &source,
            compression,
        )
        .await;
        assert_eq!(manifest.archive.filename, compression.archive_filename());

        let local = ctx.project().join(format!("vendor-{}", compression));
        let dependency = dependency("tool", &version, &ctx.remote(), &local);
        let resolution = resolver.resolve(&dependency).await.unwrap();
        assert_eq!(resolution, Resolution::Installed);

        for (path, content) in FILES {
            assert_eq!(fs::read_to_string(local.join(path)).unwrap(), *content);
        }
    }
}

#[tokio::test]
async fn test_published_manifest_matches_local_record() {
    let ctx = TestContext::new();
    let source = ctx.source("tool", FILES);
    let storage: Arc<dyn RemoteStorage> = Arc::new(LocalStorage::new());

    let published = publish(
        storage.clone(),
        &ctx.remote(),
        "tool",
        "2.0.0",
        &source,
        CompressionAlgorithm::Zstd,
    )
    .await;

    // The stored manifest decodes to exactly what was published
    let remote_bytes = storage
        .download(
            &manifest_address(&ctx.remote(), "tool", "2.0.0"),
            Expect::Present,
        )
        .await
        .unwrap();
    assert_eq!(Manifest::decode(&remote_bytes).unwrap(), published);

    let local = ctx.project().join("vendor");
    DependencyResolver::new(storage, filesystem(), false)
        .resolve(&dependency("tool", "2.0.0", &ctx.remote(), &local))
        .await
        .unwrap();

    let recorded = fs::read(local.join(".shelf").join("tool.manifest.json")).unwrap();
    assert_eq!(Manifest::decode(&recorded).unwrap(), published);
}

#[tokio::test]
async fn test_version_upgrade_replaces_files() {
    let ctx = TestContext::new();
    let storage: Arc<dyn RemoteStorage> = Arc::new(MemoryStorage::new());
    let prefix = RemoteAddress::parse("memory://packages").unwrap();

    let old = ctx.source("old", &[("lib/old.so", "old"), ("VERSION", "1")]);
    let new = ctx.source("new", &[("lib/new.so", "new"), ("VERSION", "2")]);
    publish(storage.clone(), &prefix, "lib", "1", &old, CompressionAlgorithm::Gzip).await;
    publish(storage.clone(), &prefix, "lib", "2", &new, CompressionAlgorithm::Gzip).await;

    let resolver = DependencyResolver::new(storage, filesystem(), false);
    let local = ctx.project().join("vendor");

    resolver
        .resolve(&dependency("lib", "1", &prefix, &local))
        .await
        .unwrap();
    assert!(local.join("lib/old.so").exists());

    let resolution = resolver
        .resolve(&dependency("lib", "2", &prefix, &local))
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::Reinstalled);
    assert!(!local.join("lib/old.so").exists());
    assert_eq!(fs::read_to_string(local.join("VERSION")).unwrap(), "2");
}

#[tokio::test]
async fn test_two_packages_share_a_directory() {
    let ctx = TestContext::new();
    let storage: Arc<dyn RemoteStorage> = Arc::new(MemoryStorage::new());
    let prefix = RemoteAddress::parse("memory://packages").unwrap();

    let left = ctx.source("left", &[("bin/left", "L")]);
    let right = ctx.source("right", &[("bin/right", "R")]);
    publish(storage.clone(), &prefix, "left", "1", &left, CompressionAlgorithm::Zip).await;
    publish(storage.clone(), &prefix, "right", "1", &right, CompressionAlgorithm::Zip).await;

    let resolver = DependencyResolver::new(storage, filesystem(), false);
    let local = ctx.project().join("shared");
    for name in ["left", "right"] {
        resolver
            .resolve(&dependency(name, "1", &prefix, &local))
            .await
            .unwrap();
    }

    // Each keeps its own record and neither disturbs the other
    for name in ["left", "right"] {
        assert_eq!(
            resolver
                .resolve(&dependency(name, "1", &prefix, &local))
                .await
                .unwrap(),
            Resolution::UpToDate
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_during_install() {
    let ctx = TestContext::new();
    let memory = Arc::new(MemoryStorage::new());
    let prefix = RemoteAddress::parse("memory://packages").unwrap();
    let source = ctx.source("tool", FILES);
    publish(memory.clone(), &prefix, "tool", "1", &source, CompressionAlgorithm::Zstd).await;

    memory.fail_next("memory://packages/tool/1/archive", 2);
    let storage = Arc::new(RetryStorage::new(
        memory.clone(),
        RetryPolicy::new(4, Duration::from_secs(3)),
    ));

    let local = ctx.project().join("vendor");
    let resolution = DependencyResolver::new(storage, filesystem(), false)
        .resolve(&dependency("tool", "1", &prefix, &local))
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::Installed);
}

#[tokio::test]
async fn test_missing_package_is_not_found() {
    let ctx = TestContext::new();
    let storage: Arc<dyn RemoteStorage> = Arc::new(LocalStorage::new());
    let remote = file_prefix(&ctx.project().join("nowhere"));

    let err = DependencyResolver::new(storage, filesystem(), false)
        .resolve(&dependency("ghost", "1", &remote, &ctx.project().join("vendor")))
        .await
        .unwrap_err();
    assert!(matches!(err, ShelfError::NotFound { .. }));
}
