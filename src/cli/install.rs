use indicatif::{ProgressBar, ProgressStyle};
use shelf::core::{ShelfError, ShelfResult};
use shelf::di::ServiceContainer;
use shelf::resolver::{
    DependencyListing, DependencyResolver, InstallationOrchestrator, Resolution,
};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn run(file: Option<PathBuf>, quick: bool) -> ShelfResult<()> {
    let listing = super::load_listing(file)?;
    let container = ServiceContainer::new()?;
    run_with_container(&listing, &container, quick).await
}

pub async fn run_with_container(
    listing: &DependencyListing,
    container: &ServiceContainer,
    quick: bool,
) -> ShelfResult<()> {
    if listing.is_empty() {
        println!("No dependencies to install");
        return Ok(());
    }

    println!("Resolving {} dependency(ies)...", listing.len());

    let resolver = DependencyResolver::new(
        container.storage(),
        container.filesystem(),
        quick || container.config().quick_verify(),
    );
    let orchestrator =
        InstallationOrchestrator::new(Arc::new(resolver), container.config().max_concurrent())
            .with_progress(progress_bar(listing.len()));

    let report = orchestrator.install_all(listing).await?;

    for outcome in &report.outcomes {
        println!("  ✓ {} {} ({})", outcome.name, outcome.version, outcome.resolution);
    }
    for failure in &report.failures {
        println!("  ❌ {} {}: {}", failure.name, failure.version, failure.error);
    }

    if !report.is_success() {
        return Err(ShelfError::PartialFailure {
            failed: report.failure_count(),
            total: listing.len(),
        });
    }

    println!(
        "✓ {} installed, {} reinstalled, {} up to date",
        report.count(Resolution::Installed),
        report.count(Resolution::Reinstalled),
        report.count(Resolution::UpToDate)
    );
    Ok(())
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} dependencies")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
