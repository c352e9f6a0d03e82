//! Per-core-version projections of the registry
//!
//! For a core version `v` the projection keeps:
//!
//! - extensions with at least one non-platform release supporting `v`, with
//!   their releases narrowed to those supporting `v`
//! - categories referenced by the kept extensions
//! - platforms with at least one release declared for `v`, with their
//!   releases narrowed to those supporting `v`
//! - the single `core-versions` entry for `v`
//!
//! It also derives the platform descriptor (`catalog.json`) for `v`.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{Coordinate, CoreVersions, Extension, Platform, Registry};
use crate::version::CoreVersion;

/// An extension entry of a [`PlatformDescriptor`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogExtension {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Platform descriptor for one core version: a canonical BOM pinned to the
/// core plus the non-platform extensions available for it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformDescriptor {
    pub bom_group_id: String,
    pub bom_artifact_id: String,
    pub bom_version: String,
    pub quarkus_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<CatalogExtension>,
}

/// The documents derived for a single core version
#[derive(Debug, Clone)]
pub struct VersionProjection {
    pub core: CoreVersion,
    pub registry: Registry,
    pub catalog: PlatformDescriptor,
}

pub struct VersionProjector<'a> {
    registry: &'a Registry,
    bom: Coordinate,
}

impl<'a> VersionProjector<'a> {
    /// `bom` is the canonical BOM named by every platform descriptor
    pub fn new(registry: &'a Registry, bom: Coordinate) -> Self {
        Self { registry, bom }
    }

    /// The core-versions index document
    pub fn core_versions(&self) -> &CoreVersions {
        &self.registry.core_versions
    }

    /// Projections for every known core, highest core first
    pub fn projections(&self) -> impl Iterator<Item = VersionProjection> + '_ {
        self.registry
            .core_versions
            .versions()
            .map(move |core| self.project(core))
    }

    pub fn project(&self, core: &CoreVersion) -> VersionProjection {
        let extensions = self.project_extensions(core);

        let category_ids: HashSet<&str> = extensions
            .iter()
            .flat_map(|e| e.categories())
            .collect();
        let categories = self
            .registry
            .categories
            .iter()
            .filter(|c| category_ids.contains(c.id.as_str()))
            .cloned()
            .collect();

        let platforms = self.project_platforms(core);
        let catalog = self.platform_descriptor(core, &extensions);

        VersionProjection {
            core: core.clone(),
            registry: Registry {
                core_versions: self.registry.core_versions.only(core),
                platforms,
                extensions,
                categories,
            },
            catalog,
        }
    }

    fn project_extensions(&self, core: &CoreVersion) -> Vec<Extension> {
        self.registry
            .extensions
            .iter()
            .filter(|e| {
                e.releases
                    .iter()
                    .any(|r| r.is_non_platform() && r.release.supports(core))
            })
            .map(|e| Extension {
                releases: e
                    .releases
                    .iter()
                    .filter(|r| r.release.supports(core))
                    .cloned()
                    .collect(),
                ..e.clone()
            })
            .collect()
    }

    fn project_platforms(&self, core: &CoreVersion) -> Vec<Platform> {
        self.registry
            .platforms
            .iter()
            .filter(|p| p.releases.iter().any(|r| &r.quarkus_core == core))
            .map(|p| Platform {
                id: p.id.clone(),
                releases: p
                    .releases
                    .iter()
                    .filter(|r| r.supports(core))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    fn platform_descriptor(&self, core: &CoreVersion, extensions: &[Extension]) -> PlatformDescriptor {
        PlatformDescriptor {
            bom_group_id: self.bom.group_id.clone(),
            bom_artifact_id: self.bom.artifact_id.clone(),
            bom_version: core.to_string(),
            quarkus_version: core.to_string(),
            extensions: extensions
                .iter()
                .filter_map(|e| {
                    let first = e.releases.first()?;
                    Some(CatalogExtension {
                        group_id: e.id.group_id.clone(),
                        artifact_id: e.id.artifact_id.clone(),
                        classifier: None,
                        kind: "jar".to_string(),
                        version: first.release.version.to_string(),
                        name: e.name.clone(),
                        description: e.description.clone(),
                        metadata: e.metadata.clone(),
                    })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, ExtensionRelease, Release};
    use crate::version::Version;

    fn v(s: &str) -> Version {
        Version::new(s)
    }

    fn category(id: &str) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: None,
            metadata: Default::default(),
        }
    }

    fn extension(artifact_id: &str, categories: &[&str], releases: Vec<ExtensionRelease>) -> Extension {
        let mut metadata = serde_json::Map::new();
        if !categories.is_empty() {
            metadata.insert("categories".to_string(), serde_json::json!(categories));
        }
        Extension {
            id: Coordinate::new("io.quarkiverse", artifact_id),
            name: artifact_id.to_string(),
            description: None,
            metadata,
            releases,
        }
    }

    fn sample() -> Registry {
        let bom = Coordinate::new("io.quarkus", "quarkus-bom");
        let mut platform_release = ExtensionRelease::non_platform(Release::new("1.0", "2.0"));
        platform_release.platforms.insert(bom.clone());

        let mut core_versions = CoreVersions::new();
        for core in ["2.0", "2.1", "3.0"] {
            core_versions.insert(v(core));
        }

        Registry {
            core_versions,
            platforms: vec![Platform {
                id: bom,
                releases: vec![
                    Release::new("2.0.0", "2.0"),
                    Release::new("2.1.0", "2.1").with_compatible([v("2.0")]),
                    Release::new("3.0.0", "3.0"),
                ],
            }],
            extensions: vec![
                extension(
                    "quarkus-compat",
                    &["web"],
                    vec![
                        ExtensionRelease::non_platform(
                            Release::new("0.2", "2.0").with_compatible([v("2.1")]),
                        ),
                        ExtensionRelease::non_platform(Release::new("0.3", "3.0")),
                    ],
                ),
                extension("quarkus-in-bom", &["data"], vec![platform_release]),
            ],
            categories: vec![category("data"), category("web")],
        }
    }

    #[test]
    fn test_extensions_follow_compatibility() {
        let registry = sample();
        let projector = VersionProjector::new(&registry, Coordinate::new("io.quarkus", "quarkus-bom"));

        for core in ["2.0", "2.1"] {
            let projection = projector.project(&v(core));
            assert_eq!(projection.registry.extensions.len(), 1, "core {}", core);
            let ext = &projection.registry.extensions[0];
            assert_eq!(ext.id.artifact_id, "quarkus-compat");
            assert_eq!(ext.releases.len(), 1);
            assert_eq!(ext.releases[0].release.version, v("0.2"));
        }

        let projection = projector.project(&v("3.0"));
        assert_eq!(projection.registry.extensions[0].releases[0].release.version, v("0.3"));
    }

    #[test]
    fn test_platform_only_extensions_are_dropped() {
        let registry = sample();
        let projector = VersionProjector::new(&registry, Coordinate::new("io.quarkus", "quarkus-bom"));
        let projection = projector.project(&v("2.0"));
        assert!(projection
            .registry
            .extension(&Coordinate::new("io.quarkiverse", "quarkus-in-bom"))
            .is_none());
        // "data" is only referenced by the dropped extension
        let ids: Vec<_> = projection.registry.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["web"]);
    }

    #[test]
    fn test_platform_releases_narrowed() {
        let registry = sample();
        let projector = VersionProjector::new(&registry, Coordinate::new("io.quarkus", "quarkus-bom"));

        let projection = projector.project(&v("2.0"));
        let versions: Vec<_> = projection.registry.platforms[0]
            .releases
            .iter()
            .map(|r| r.version.as_str())
            .collect();
        assert_eq!(versions, vec!["2.0.0", "2.1.0"]);

        let cores: Vec<_> = projection.registry.core_versions.versions().collect();
        assert_eq!(cores, vec![&v("2.0")]);
    }

    #[test]
    fn test_platform_descriptor() {
        let registry = sample();
        let projector = VersionProjector::new(&registry, Coordinate::new("io.quarkus", "quarkus-bom"));
        let catalog = projector.project(&v("2.1")).catalog;

        assert_eq!(catalog.quarkus_version, "2.1");
        assert_eq!(catalog.bom_version, "2.1");
        assert_eq!(catalog.extensions.len(), 1);
        assert_eq!(catalog.extensions[0].version, "0.2");

        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["quarkus-version"], "2.1");
        assert_eq!(json["extensions"][0]["type"], "jar");
        assert!(json["extensions"][0].get("classifier").is_none());
    }

    #[test]
    fn test_projections_highest_core_first() {
        let registry = sample();
        let projector = VersionProjector::new(&registry, Coordinate::new("io.quarkus", "quarkus-bom"));
        let cores: Vec<_> = projector.projections().map(|p| p.core.to_string()).collect();
        assert_eq!(cores, vec!["3.0", "2.1", "2.0"]);
    }
}
