pub mod archive;
pub mod builder;
pub mod checksum;
pub mod installer;
pub mod integrity;
pub mod publisher;
// manifest lives in shelf-core, re-exported here alongside the code that uses it
pub mod manifest {
    pub use shelf_core::package::manifest::*;
}

pub use archive::{archive_writer, extract, ArchiveWriter, EntryHeader};
pub use builder::{build_package, BuiltPackage, PackageBuilder};
pub use checksum::ContentHasher;
pub use installer::{InstallRequest, PackageInstaller};
pub use integrity::{
    standard_chain, CompoundCheck, ContentHashCheck, FileListingCheck, IntegrityCheck,
    VersionCheck,
};
pub use publisher::{PublishRequest, Publisher};
