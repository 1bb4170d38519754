//! Service container for dependency injection

use super::traits::{ConfigProvider, FileSystem, RemoteStorage};
use crate::config::Config;
use crate::core::ShelfResult;
use crate::fs::LocalFileSystem;
use crate::storage::{RetryStorage, SchemeRouter};
use std::sync::Arc;

/// Service container for dependency injection
///
/// Holds the services a command needs as trait objects. The storage held
/// here already retries; callers never wrap it again.
///
/// # Example (Production)
///
/// ```no_run
/// use shelf::di::ServiceContainer;
///
/// # fn example() -> shelf::core::ShelfResult<()> {
/// let container = ServiceContainer::new()?;
/// println!("Max concurrent: {}", container.config().max_concurrent());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ServiceContainer {
    pub config: Arc<dyn ConfigProvider>,
    pub storage: Arc<dyn RemoteStorage>,
    pub filesystem: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with production implementations
    ///
    /// Loads (or creates) the config file, then routes `file://`, `http://`
    /// and `https://` addresses through the retry client.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Config file cannot be loaded or created
    /// - The HTTP client cannot be initialised
    pub fn new() -> ShelfResult<Self> {
        Self::with_config(Config::load()?)
    }

    /// Create a production container around an already loaded config
    pub fn with_config(config: Config) -> ShelfResult<Self> {
        let router = SchemeRouter::standard(config.http_timeout())?;
        let storage = RetryStorage::new(Arc::new(router), config.retry_policy());

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            filesystem: Arc::new(LocalFileSystem::new()),
        })
    }

    /// Create a service container with custom provider implementations
    ///
    /// This is primarily useful for testing, where you can inject an
    /// in-memory storage or a mock configuration.
    pub fn with_providers(
        config: Arc<dyn ConfigProvider>,
        storage: Arc<dyn RemoteStorage>,
        filesystem: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            config,
            storage,
            filesystem,
        }
    }

    /// Get the configuration provider
    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }

    /// Get the remote storage
    pub fn storage(&self) -> Arc<dyn RemoteStorage> {
        Arc::clone(&self.storage)
    }

    /// Get the local file system
    pub fn filesystem(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.filesystem)
    }
}
