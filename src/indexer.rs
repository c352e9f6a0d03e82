//! Registry indexer
//!
//! Folds a [`RepositoryInventory`] into a [`Registry`]. Platform releases are
//! expanded through their BOM: every extension the BOM pins gets an
//! [`ExtensionRelease`] tagged with the platform. Non-platform extension
//! releases are recorded with an empty platform set.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::model::{
    Category, Coordinate, CoreVersions, Extension, ExtensionRelease, Platform, Registry, Release,
};
use crate::repository::RepositoryInventory;
use crate::resolver::{ArtifactResolver, PinnedExtension};
use crate::version::Version;

#[derive(Default)]
struct ExtensionEntry {
    name: Option<String>,
    description: Option<String>,
    metadata: serde_json::Map<String, serde_json::Value>,
    releases: Vec<ExtensionRelease>,
}

impl ExtensionEntry {
    fn fill_details(
        &mut self,
        name: Option<&String>,
        description: Option<&String>,
        metadata: &serde_json::Map<String, serde_json::Value>,
        overwrite: bool,
    ) {
        if let Some(name) = name {
            if overwrite || self.name.is_none() {
                self.name = Some(name.clone());
            }
        }
        if let Some(description) = description {
            if overwrite || self.description.is_none() {
                self.description = Some(description.clone());
            }
        }
        if !metadata.is_empty() && (overwrite || self.metadata.is_empty()) {
            self.metadata = metadata.clone();
        }
    }
}

/// Accumulates platforms, extensions and categories before freezing them
/// into a sorted [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    core_versions: CoreVersions,
    platforms: BTreeMap<Coordinate, Vec<Release>>,
    extensions: BTreeMap<Coordinate, ExtensionEntry>,
    categories: BTreeMap<String, Category>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_cores(&mut self, release: &Release) {
        self.core_versions.insert(release.quarkus_core.clone());
        for core in &release.compatible_quarkus_core {
            self.core_versions.insert(core.clone());
        }
    }

    pub fn add_platform_release(&mut self, id: &Coordinate, release: Release) {
        self.add_cores(&release);
        let releases = self.platforms.entry(id.clone()).or_default();
        match releases.iter_mut().find(|r| r.version == release.version) {
            Some(existing) => *existing = release,
            None => releases.push(release),
        }
    }

    /// Record that `platform` pins `pinned` for the given platform release
    pub fn add_platform_extension(&mut self, platform: &Coordinate, platform_release: &Release, pinned: &PinnedExtension) {
        let release = Release {
            version: pinned.version.clone(),
            quarkus_core: platform_release.quarkus_core.clone(),
            compatible_quarkus_core: platform_release.compatible_quarkus_core.clone(),
        };
        self.add_cores(&release);

        let entry = self.extensions.entry(pinned.coordinate.clone()).or_default();
        entry.fill_details(pinned.name.as_ref(), pinned.description.as_ref(), &pinned.metadata, false);

        let existing = entry
            .releases
            .iter_mut()
            .find(|r| !r.is_non_platform() && r.release == release);
        match existing {
            Some(r) => {
                r.platforms.insert(platform.clone());
            }
            None => {
                let mut r = ExtensionRelease::non_platform(release);
                r.platforms.insert(platform.clone());
                entry.releases.push(r);
            }
        }
    }

    pub fn add_non_platform_release(
        &mut self,
        id: &Coordinate,
        release: Release,
        name: Option<&String>,
        description: Option<&String>,
        metadata: &serde_json::Map<String, serde_json::Value>,
    ) {
        self.add_cores(&release);
        let entry = self.extensions.entry(id.clone()).or_default();
        entry.fill_details(name, description, metadata, true);
        match entry
            .releases
            .iter_mut()
            .find(|r| r.is_non_platform() && r.release.version == release.version)
        {
            Some(existing) => existing.release = release,
            None => entry.releases.push(ExtensionRelease::non_platform(release)),
        }
    }

    pub fn add_category(&mut self, category: Category) {
        self.categories.insert(category.id.clone(), category);
    }

    pub fn build(self) -> Registry {
        Registry {
            core_versions: self.core_versions,
            platforms: self
                .platforms
                .into_iter()
                .map(|(id, releases)| Platform { id, releases })
                .collect(),
            extensions: self
                .extensions
                .into_iter()
                .map(|(id, entry)| Extension {
                    name: entry.name.unwrap_or_else(|| id.artifact_id.clone()),
                    id,
                    description: entry.description,
                    metadata: entry.metadata,
                    releases: entry.releases,
                })
                .collect(),
            categories: self.categories.into_values().collect(),
        }
    }
}

/// Builds a [`Registry`] from raw releases, resolving each BOM once per run
pub struct RegistryIndexer<'a> {
    resolver: &'a dyn ArtifactResolver,
    cache: HashMap<(Coordinate, Version), Rc<Vec<PinnedExtension>>>,
}

impl<'a> RegistryIndexer<'a> {
    pub fn new(resolver: &'a dyn ArtifactResolver) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    /// Resolve a BOM, reusing the result of an earlier call for the same key
    pub fn resolve(&mut self, bom: &Coordinate, version: &Version) -> Result<Rc<Vec<PinnedExtension>>> {
        let key = (bom.clone(), version.clone());
        if let Some(hit) = self.cache.get(&key) {
            debug!("BOM cache hit for {}:{}", bom, version);
            return Ok(Rc::clone(hit));
        }
        let pinned = self
            .resolver
            .resolve_bom(bom, version)
            .map_err(|e| CatalogError::Index {
                coordinate: bom.to_string(),
                version: version.to_string(),
                message: format!("{:#}", e),
            })?;
        let pinned = Rc::new(pinned);
        self.cache.insert(key, Rc::clone(&pinned));
        Ok(pinned)
    }

    pub fn index(&mut self, inventory: &RepositoryInventory) -> Result<Registry> {
        let mut builder = RegistryBuilder::new();

        for (raw, descriptor) in inventory.platform_releases() {
            let release = Release::new(raw.version.clone(), descriptor.quarkus_core_version.clone())
                .with_compatible(descriptor.compatible_quarkus_core_versions.iter().cloned());
            let pinned = self.resolve(&raw.coordinate, &raw.version)?;
            for extension in pinned.iter() {
                builder.add_platform_extension(&raw.coordinate, &release, extension);
            }
            builder.add_platform_release(&raw.coordinate, release);
        }

        for (raw, descriptor) in inventory.extension_releases() {
            let release = Release::new(raw.version.clone(), descriptor.quarkus_core_version.clone())
                .with_compatible(descriptor.compatible_quarkus_core_versions.iter().cloned());
            builder.add_non_platform_release(
                &raw.coordinate,
                release,
                descriptor.name.as_ref(),
                descriptor.description.as_ref(),
                &descriptor.metadata,
            );
        }

        for category in &inventory.categories {
            builder.add_category(category.clone());
        }

        let registry = builder.build();
        info!(
            "Indexed {} platforms, {} extensions, {} categories across {} core versions",
            registry.platforms.len(),
            registry.extensions.len(),
            registry.categories.len(),
            registry.core_versions.len()
        );
        Ok(registry)
    }
}
