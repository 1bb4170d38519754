pub mod dependency;
pub mod dependency_resolver;
pub mod orchestrator;

pub use dependency::{Dependency, DependencyListing};
pub use dependency_resolver::{DependencyResolver, Resolution};
pub use orchestrator::{DependencyFailure, DependencyOutcome, InstallReport, InstallationOrchestrator};
