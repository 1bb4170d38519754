use shelf::core::{ShelfError, ShelfResult};
use shelf::di::ServiceContainer;
use shelf::resolver::{DependencyListing, DependencyResolver};
use std::path::PathBuf;

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
        println!("No dependencies to verify");
        return Ok(());
    }

    let resolver = DependencyResolver::new(
        container.storage(),
        container.filesystem(),
        quick || container.config().quick_verify(),
    );

    println!("Verifying {} dependency(ies)...", listing.len());

    let mut failed = 0;
    for dependency in &listing.dependencies {
        match resolver.verify(dependency).await {
            Ok(()) => println!("  ✓ {} {}", dependency.name, dependency.version),
            Err(e) => {
                failed += 1;
                println!("  ❌ {} {}: {}", dependency.name, dependency.version, e);
            }
        }
    }

    if failed > 0 {
        return Err(ShelfError::PartialFailure {
            failed,
            total: listing.len(),
        });
    }

    println!("✓ All dependencies verified successfully");
    Ok(())
}
