use crate::core::{ShelfError, ShelfResult};
use crate::resolver::dependency::{Dependency, DependencyListing};
use crate::resolver::dependency_resolver::{DependencyResolver, Resolution};
use indicatif::ProgressBar;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinSet};

/// A dependency that resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOutcome {
    pub name: String,
    pub version: String,
    pub resolution: Resolution,
}

/// A dependency that did not
#[derive(Debug)]
pub struct DependencyFailure {
    pub name: String,
    pub version: String,
    pub error: ShelfError,
}

/// Everything one run resolved or failed to resolve, in completion order
#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<DependencyOutcome>,
    pub failures: Vec<DependencyFailure>,
}

impl InstallReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn count(&self, resolution: Resolution) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.resolution == resolution)
            .count()
    }
}

/// Resolves every dependency of a listing concurrently
///
/// Dependencies sharing an installation root resolve one after another in a
/// single task; separate roots resolve in parallel, at most `max_concurrent`
/// at once. A failing dependency never stops or cancels the others. There is
/// no cancellation: once started, a run ends only when every task has
/// reported.
pub struct InstallationOrchestrator {
    resolver: Arc<DependencyResolver>,
    max_concurrent: usize,
    progress: ProgressBar,
}

impl InstallationOrchestrator {
    pub fn new(resolver: Arc<DependencyResolver>, max_concurrent: usize) -> Self {
        Self {
            resolver,
            max_concurrent: max_concurrent.max(1),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report progress (one tick per finished dependency) on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve every dependency in `listing`
    ///
    /// Fails only when the listing is invalid, before anything is launched.
    /// Per-dependency failures are collected in the report.
    pub async fn install_all(&self, listing: &DependencyListing) -> ShelfResult<InstallReport> {
        listing.validate()?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (sender, mut receiver) = mpsc::unbounded_channel::<(Dependency, ShelfResult<Resolution>)>();
        let mut tasks = JoinSet::new();
        let mut launched: HashMap<task::Id, Vec<Dependency>> = HashMap::new();
        self.progress.set_length(listing.len() as u64);

        for group in group_by_root(&listing.dependencies) {
            let resolver = Arc::clone(&self.resolver);
            let semaphore = Arc::clone(&semaphore);
            let sender = sender.clone();
            let dependencies = group.clone();

            let handle = tasks.spawn(async move {
                for dependency in dependencies {
                    let result = match semaphore.acquire().await {
                        Ok(_permit) => resolver.resolve(&dependency).await,
                        Err(e) => Err(ShelfError::Task(e.to_string())),
                    };
                    // The receiver outlives every task
                    let _ = sender.send((dependency, result));
                }
            });
            launched.insert(handle.id(), group);
        }
        // Only task-held senders remain, so the channel closes once all tasks finish
        drop(sender);

        let mut report = InstallReport::default();
        let mut reported: HashSet<(PathBuf, String)> = HashSet::new();
        while let Some((dependency, result)) = receiver.recv().await {
            self.progress.inc(1);
            reported.insert((dependency.local.clone(), dependency.name.clone()));
            match result {
                Ok(resolution) => {
                    tracing::info!(
                        package = %dependency.name,
                        version = %dependency.version,
                        resolution = %resolution,
                        "resolved"
                    );
                    report.outcomes.push(DependencyOutcome {
                        name: dependency.name,
                        version: dependency.version,
                        resolution,
                    });
                }
                Err(error) => {
                    tracing::error!(
                        package = %dependency.name,
                        version = %dependency.version,
                        error = %error,
                        "failed to resolve"
                    );
                    report.failures.push(DependencyFailure {
                        name: dependency.name,
                        version: dependency.version,
                        error,
                    });
                }
            }
        }

        // A task that panicked dropped its sender before reporting the rest of its group
        while let Some(joined) = tasks.join_next().await {
            let Err(e) = joined else {
                continue;
            };
            let unreported = launched
                .remove(&e.id())
                .unwrap_or_default()
                .into_iter()
                .filter(|dependency| {
                    !reported.contains(&(dependency.local.clone(), dependency.name.clone()))
                });
            for dependency in unreported {
                tracing::error!(
                    package = %dependency.name,
                    version = %dependency.version,
                    error = %e,
                    "resolution task did not complete"
                );
                self.progress.inc(1);
                report.failures.push(DependencyFailure {
                    name: dependency.name,
                    version: dependency.version,
                    error: ShelfError::Task(e.to_string()),
                });
            }
        }

        self.progress.finish_and_clear();
        Ok(report)
    }
}

/// Dependencies grouped by installation root, in listing order
fn group_by_root(dependencies: &[Dependency]) -> Vec<Vec<Dependency>> {
    let mut index: HashMap<&Path, usize> = HashMap::new();
    let mut groups: Vec<Vec<Dependency>> = Vec::new();

    for dependency in dependencies {
        match index.get(dependency.local.as_path()) {
            Some(&at) => groups[at].push(dependency.clone()),
            None => {
                index.insert(dependency.local.as_path(), groups.len());
                groups.push(vec![dependency.clone()]);
            }
        }
    }
    groups
}
