//! Multi-dependency installs

use super::common::{dependency, filesystem, publish, TestContext};
use shelf::core::{CompressionAlgorithm, ShelfError};
use shelf::resolver::{
    DependencyListing, DependencyResolver, InstallationOrchestrator, Resolution,
};
use shelf::storage::{MemoryStorage, RemoteAddress};
use std::fs;
use std::sync::Arc;

async fn published(ctx: &TestContext, names: &[&str]) -> (Arc<MemoryStorage>, RemoteAddress) {
    let storage = Arc::new(MemoryStorage::new());
    let prefix = RemoteAddress::parse("memory://packages").unwrap();
    for name in names {
        let content = format!("{} content", name);
        let source = ctx.source(name, &[("data.txt", content.as_str())]);
        publish(storage.clone(), &prefix, name, "1", &source, CompressionAlgorithm::Zstd).await;
    }
    (storage, prefix)
}

fn orchestrator(storage: Arc<MemoryStorage>) -> InstallationOrchestrator {
    let resolver = DependencyResolver::new(storage, filesystem(), false);
    InstallationOrchestrator::new(Arc::new(resolver), 8)
}

#[tokio::test]
async fn test_one_failure_among_three() {
    let ctx = TestContext::new();
    let (storage, prefix) = published(&ctx, &["one", "two", "three"]).await;
    storage.fail_always("memory://packages/two/");

    let listing = DependencyListing::new(
        ["one", "two", "three"]
            .iter()
            .map(|name| dependency(name, "1", &prefix, &ctx.project().join(name)))
            .collect(),
    );

    let report = orchestrator(storage).install_all(&listing).await.unwrap();

    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures[0].name, "two");
    assert!(matches!(
        report.failures[0].error,
        ShelfError::Transport { .. }
    ));
    for name in ["one", "three"] {
        assert_eq!(
            fs::read_to_string(ctx.project().join(name).join("data.txt")).unwrap(),
            format!("{} content", name)
        );
    }
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let ctx = TestContext::new();
    let names = ["a", "b", "c"];
    let (storage, prefix) = published(&ctx, &names).await;
    let listing = DependencyListing::new(
        names
            .iter()
            .map(|name| dependency(name, "1", &prefix, &ctx.project().join(name)))
            .collect(),
    );
    let orchestrator = orchestrator(storage.clone());

    let first = orchestrator.install_all(&listing).await.unwrap();
    assert_eq!(first.count(Resolution::Installed), 3);

    let downloads = storage.download_count();
    let second = orchestrator.install_all(&listing).await.unwrap();
    assert_eq!(second.count(Resolution::UpToDate), 3);
    assert_eq!(storage.download_count(), downloads);
}

#[tokio::test]
async fn test_damaged_dependency_is_repaired_alone() {
    let ctx = TestContext::new();
    let names = ["a", "b"];
    let (storage, prefix) = published(&ctx, &names).await;
    let listing = DependencyListing::new(
        names
            .iter()
            .map(|name| dependency(name, "1", &prefix, &ctx.project().join(name)))
            .collect(),
    );
    let orchestrator = orchestrator(storage);
    orchestrator.install_all(&listing).await.unwrap();

    fs::remove_file(ctx.project().join("b").join("data.txt")).unwrap();

    let report = orchestrator.install_all(&listing).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.count(Resolution::UpToDate), 1);
    assert_eq!(report.count(Resolution::Reinstalled), 1);
    assert!(ctx.project().join("b").join("data.txt").exists());
}
