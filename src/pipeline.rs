//! End-to-end catalog run
//!
//! read -> index, then for each catalog family: write -> package -> publish.
//! The non-platform family (registries and per-core catalogs) goes first,
//! then the platform family (default-platform documents).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{CatalogCoordinates, Packager, PublishUnit};
use crate::catalog::{version_dir_name, CatalogWriter, OutputLayout};
use crate::defaults::DefaultPlatformSelector;
use crate::error::{CatalogError, Result};
use crate::indexer::RegistryIndexer;
use crate::model::{Coordinate, Registry};
use crate::projection::VersionProjector;
use crate::publish::Publisher;
use crate::repository::RepositoryReader;
use crate::resolver::ArtifactResolver;
use crate::version::{CoreVersion, Version};

/// Non-fatal conditions surfaced by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A second descriptor for the same release replaced the first
    DuplicateDescriptor {
        coordinate: Coordinate,
        version: Version,
        path: PathBuf,
    },
    MissingOutputRoot { path: PathBuf },
    NothingToPublish { path: PathBuf },
    /// No default-platforms roll-up: the registry has no platforms
    NoPlatforms,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateDescriptor {
                coordinate,
                version,
                path,
            } => write!(
                f,
                "duplicate descriptor for {}:{} in {}",
                coordinate,
                version,
                path.display()
            ),
            Warning::MissingOutputRoot { path } => {
                write!(f, "{} does not exist or is not a directory", path.display())
            }
            Warning::NothingToPublish { path } => write!(
                f,
                "nothing to publish: no core-version catalogs under {}",
                path.display()
            ),
            Warning::NoPlatforms => {
                write!(f, "no platforms found, default platforms were not generated")
            }
        }
    }
}

/// Which catalog families a run emits and publishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    #[default]
    All,
    /// Registries, per-core catalogs and the non-platform artifacts
    NonPlatform,
    /// Default-platform documents and the platform catalog artifacts
    Platforms,
}

impl Scope {
    pub fn includes_non_platform(self) -> bool {
        matches!(self, Scope::All | Scope::NonPlatform)
    }

    pub fn includes_platforms(self) -> bool {
        matches!(self, Scope::All | Scope::Platforms)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub repository_dir: PathBuf,
    /// A directory when `split`, otherwise the registry file
    pub output: PathBuf,
    pub split: bool,
    pub pretty: bool,
    pub default_platform: Coordinate,
    pub default_platform_version: Option<Version>,
    /// Marked as default where `default_platform` has no release
    pub fallback_platform: Coordinate,
    pub json: CatalogCoordinates,
    pub scope: Scope,
}

impl PipelineOptions {
    pub fn new(repository_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let bom = Coordinate::new("io.quarkus", "quarkus-bom");
        Self {
            repository_dir: repository_dir.into(),
            output: output.into(),
            split: true,
            pretty: true,
            default_platform: bom.clone(),
            default_platform_version: None,
            fallback_platform: bom,
            json: CatalogCoordinates::new("io.quarkus.registry", "quarkus-platforms"),
            scope: Scope::All,
        }
    }
}

/// What a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    /// Core versions of the registry, highest first
    pub core_versions: Vec<CoreVersion>,
    /// JSON documents written, in write order
    pub documents: Vec<PathBuf>,
    /// Packaged units, in publish order
    pub units: Vec<PublishUnit>,
    pub installed: usize,
    pub deployed: usize,
    pub warnings: Vec<Warning>,
}

pub struct CatalogPipeline<'a> {
    options: PipelineOptions,
    resolver: &'a dyn ArtifactResolver,
    publisher: Publisher<'a>,
}

impl<'a> CatalogPipeline<'a> {
    pub fn new(options: PipelineOptions, resolver: &'a dyn ArtifactResolver, publisher: Publisher<'a>) -> Self {
        Self {
            options,
            resolver,
            publisher,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        let inventory = RepositoryReader::new(&self.options.repository_dir).read()?;
        report.warnings.extend(inventory.warnings.iter().cloned());

        let registry = RegistryIndexer::new(self.resolver).index(&inventory)?;
        report.core_versions = registry.core_versions.versions().cloned().collect();

        let writer = CatalogWriter::new(self.options.pretty);
        if self.options.split {
            self.emit_split(&registry, &writer, &mut report)?;
        } else {
            writer.write(&registry, &self.options.output)?;
            report.documents.push(self.options.output.clone());
            self.publish_from(0, &mut report)?;
        }

        info!(
            "Catalog run finished: {} documents, {} units, {} warnings",
            report.documents.len(),
            report.units.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Each family is published right after it is written
    fn emit_split(&self, registry: &Registry, writer: &CatalogWriter, report: &mut RunReport) -> Result<()> {
        check_version_dirs(registry)?;

        let layout = OutputLayout::new(&self.options.output);
        let packager = Packager::new();

        if self.options.scope.includes_non_platform() {
            let first = report.units.len();
            self.emit_non_platform(registry, writer, &layout, &packager, report)?;
            self.publish_from(first, report)?;
        }
        if self.options.scope.includes_platforms() {
            let first = report.units.len();
            self.emit_platforms(registry, writer, &layout, &packager, report)?;
            self.publish_from(first, report)?;
        }
        Ok(())
    }

    /// Publish the units packaged since `first`
    fn publish_from(&self, first: usize, report: &mut RunReport) -> Result<()> {
        let published = self.publisher.publish(&self.options.output, &report.units[first..])?;
        report.installed += published.installed;
        report.deployed += published.deployed;
        for warning in published.warnings {
            if !report.warnings.contains(&warning) {
                report.warnings.push(warning);
            }
        }
        Ok(())
    }

    fn emit_non_platform(
        &self,
        registry: &Registry,
        writer: &CatalogWriter,
        layout: &OutputLayout,
        packager: &Packager,
        report: &mut RunReport,
    ) -> Result<()> {
        writer.write(registry, &layout.registry())?;
        report.documents.push(layout.registry());

        let projector = VersionProjector::new(registry, self.options.fallback_platform.clone());
        writer.write(projector.core_versions(), &layout.versions())?;
        report.documents.push(layout.versions());

        let coordinates = CatalogCoordinates::non_platform();
        for projection in projector.projections() {
            let core = &projection.core;
            writer.write(&projection.registry, &layout.version_registry(core))?;
            report.documents.push(layout.version_registry(core));

            let catalog = layout.version_catalog(core);
            writer.write(&projection.catalog, &catalog)?;
            report.documents.push(catalog.clone());

            let unit = packager.package_file(
                &layout.version_dir(core),
                coordinates.for_core(core.as_str()),
                &catalog,
            )?;
            report.units.push(unit);
        }
        Ok(())
    }

    fn emit_platforms(
        &self,
        registry: &Registry,
        writer: &CatalogWriter,
        layout: &OutputLayout,
        packager: &Packager,
        report: &mut RunReport,
    ) -> Result<()> {
        let selector = DefaultPlatformSelector::new(
            self.options.default_platform.clone(),
            self.options.default_platform_version.clone(),
            self.options.fallback_platform.clone(),
        );

        match selector.latest_across(registry)? {
            Some(latest) => {
                let path = layout.default_platforms();
                writer.write(&latest, &path)?;
                report.documents.push(path.clone());
                let unit = packager.package_file(layout.root(), self.options.json.unversioned(), &path)?;
                report.units.push(unit);
            }
            None => {
                warn!("{}", Warning::NoPlatforms);
                report.warnings.push(Warning::NoPlatforms);
            }
        }

        for (core, document) in selector.per_core(registry)? {
            let coords = self.options.json.for_core(core.as_str());
            let dir = layout.version_dir(&core);
            let bytes = writer.to_bytes(&document, &dir.join(coords.file_name()))?;
            let unit = packager.package(&dir, coords, &bytes)?;
            info!("Wrote {}", unit.primary.file.display());
            report.documents.push(unit.primary.file.clone());
            report.units.push(unit);
        }
        Ok(())
    }
}

/// Two core versions must not share an output directory
fn check_version_dirs(registry: &Registry) -> Result<()> {
    let mut seen: BTreeMap<String, &CoreVersion> = BTreeMap::new();
    for core in registry.core_versions.versions() {
        let name = version_dir_name(core);
        if let Some(other) = seen.insert(name.clone(), core) {
            return Err(CatalogError::Project(format!(
                "core versions {} and {} both map to directory {}",
                other, core, name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::CoreVersions;

    #[test]
    fn test_scope_flags() {
        assert!(Scope::All.includes_non_platform() && Scope::All.includes_platforms());
        assert!(!Scope::NonPlatform.includes_platforms());
        assert!(!Scope::Platforms.includes_non_platform());
    }

    #[test]
    fn test_version_dir_collision() {
        let mut core_versions = CoreVersions::new();
        core_versions.insert(Version::new("999-SNAPSHOT"));
        core_versions.insert(Version::new("999-DEV"));
        let registry = Registry {
            core_versions,
            ..Default::default()
        };
        let err = check_version_dirs(&registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Project);
        assert!(err.to_string().contains("999-DEV"));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::NothingToPublish {
            path: PathBuf::from("target/json"),
        };
        assert!(warning.to_string().contains("target/json"));
    }
}
