use shelf::core::{CompressionAlgorithm, ShelfResult};
use shelf::di::ServiceContainer;
use shelf::package::{PublishRequest, Publisher};
use shelf::storage::RemoteAddress;
use std::path::PathBuf;

pub struct PublishOptions {
    pub dir: PathBuf,
    pub name: String,
    pub version: String,
    pub remote: String,
    pub compression: Option<CompressionAlgorithm>,
}

pub async fn run(options: PublishOptions) -> ShelfResult<()> {
    let container = ServiceContainer::new()?;
    run_with_container(options, &container).await
}

pub async fn run_with_container(
    options: PublishOptions,
    container: &ServiceContainer,
) -> ShelfResult<()> {
    let request = PublishRequest {
        name: options.name,
        version: options.version,
        source_dir: options.dir,
        remote_prefix: RemoteAddress::parse(&options.remote)?,
        compression: options
            .compression
            .unwrap_or_else(|| container.config().compression()),
    };

    println!(
        "Publishing {} {} to {}...",
        request.name, request.version, request.remote_prefix
    );

    let publisher = Publisher::new(container.storage(), container.filesystem());
    let manifest = publisher.publish(&request).await?;

    println!(
        "✓ Published {} {} ({} file(s), {} bytes {})",
        manifest.name,
        manifest.version,
        manifest.archive.contents.len(),
        manifest.archive.size,
        manifest.archive.compression_algorithm
    );
    Ok(())
}
