//! Quarkus Registry Catalogs
//!
//! Indexes an on-disk extension registry repository and publishes the JSON
//! catalogs derived from it, one family per core framework version.
//!
//! ## Features
//!
//! - **Indexing**: platforms, extensions and categories normalized into a [`Registry`]
//! - **Per-core projections**: version-scoped registries and platform descriptors
//! - **Default platforms**: latest release per platform, honoring a pinned default
//! - **Publishing**: install to the local artifact cache, then deploy
//!
//! ## Output
//!
//! ```text
//! target/json/
//! ├── registry.json
//! ├── versions.json
//! ├── default-platforms.json
//! ├── quarkus-platforms-1.0-SNAPSHOT.{json,pom}
//! └── 2.0.0.Final/
//!     ├── registry.json
//!     ├── catalog.json
//!     ├── quarkus-non-platform-extensions-2.0.0.Final-1.0-SNAPSHOT.{json,pom}
//!     └── quarkus-platforms-2.0.0.Final-1.0-SNAPSHOT.{json,pom}
//! ```

pub mod artifact;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod defaults;
pub mod error;
pub mod indexer;
pub mod model;
pub mod pipeline;
pub mod projection;
pub mod publish;
pub mod repository;
pub mod resolver;
pub mod version;

pub use artifact::{Artifact, ArtifactCoords, CatalogCoordinates, Packager, PublishUnit};
pub use catalog::{CatalogWriter, OutputLayout};
pub use checksum::Checksum;
pub use config::CatalogConfig;
pub use defaults::{DefaultPlatformSelector, DefaultPlatforms};
pub use error::{CatalogError, ErrorKind, Result};
pub use indexer::RegistryIndexer;
pub use model::{Category, Coordinate, CoreVersions, Extension, ExtensionRelease, Platform, Registry, Release};
pub use pipeline::{CatalogPipeline, PipelineOptions, RunReport, Scope, Warning};
pub use projection::{PlatformDescriptor, VersionProjection, VersionProjector};
pub use publish::{
    ArtifactDeployer, ArtifactInstaller, FileDeployer, Goal, LocalRepositoryInstaller, Publisher, RemoteRepository,
    Session, SettingsSession,
};
pub use repository::{RepositoryInventory, RepositoryReader};
pub use resolver::{ArtifactResolver, LocalRepositoryResolver, PinnedExtension};
pub use version::{CoreVersion, Version};
