//! Default platform selection
//!
//! For every core version the selector picks one release per platform
//! coordinate, preferring the highest version unless a pinned default
//! version has already been chosen for the pinned coordinate. Releases are
//! visited in ascending version order, so a pinned version that exists for
//! a core is always the one selected.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::model::{Coordinate, Registry};
use crate::version::{CoreVersion, Version};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformEntry {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// Chosen platforms plus the one a tool should use when not told otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DefaultPlatforms {
    pub default_platform: Coordinate,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<PlatformEntry>,
}

impl DefaultPlatforms {
    pub fn builder() -> DefaultPlatformsBuilder {
        DefaultPlatformsBuilder::default()
    }

    pub fn version_of(&self, platform: &Coordinate) -> Option<&str> {
        self.platforms
            .iter()
            .find(|p| p.group_id == platform.group_id && p.artifact_id == platform.artifact_id)
            .map(|p| p.version.as_str())
    }
}

#[derive(Debug, Default)]
pub struct DefaultPlatformsBuilder {
    default_platform: Option<Coordinate>,
    platforms: Vec<PlatformEntry>,
}

impl DefaultPlatformsBuilder {
    pub fn default_platform(mut self, platform: Coordinate) -> Self {
        self.default_platform = Some(platform);
        self
    }

    pub fn add_platform(mut self, platform: &Coordinate, version: &Version) -> Self {
        self.platforms.push(PlatformEntry {
            group_id: platform.group_id.clone(),
            artifact_id: platform.artifact_id.clone(),
            version: version.to_string(),
        });
        self
    }

    /// Fails unless the default platform is one of the listed platforms
    pub fn build(self) -> Result<DefaultPlatforms> {
        let default_platform = self
            .default_platform
            .ok_or_else(|| CatalogError::Project("no default platform set".to_string()))?;
        let listed = self.platforms.iter().any(|p| {
            p.group_id == default_platform.group_id && p.artifact_id == default_platform.artifact_id
        });
        if !listed {
            return Err(CatalogError::InconsistentDefault {
                platform: default_platform.to_string(),
                reason: "not present in the list of platforms".to_string(),
            });
        }
        Ok(DefaultPlatforms {
            default_platform,
            platforms: self.platforms,
        })
    }
}

pub struct DefaultPlatformSelector {
    pinned: Coordinate,
    pinned_version: Option<Version>,
    fallback: Coordinate,
}

impl DefaultPlatformSelector {
    /// `pinned` is the preferred default platform, `fallback` is marked as
    /// default for cores where `pinned` has no release
    pub fn new(pinned: Coordinate, pinned_version: Option<Version>, fallback: Coordinate) -> Self {
        Self {
            pinned,
            pinned_version,
            fallback,
        }
    }

    fn is_pin(&self, platform: &Coordinate, chosen: &Version) -> bool {
        platform == &self.pinned && self.pinned_version.as_ref() == Some(chosen)
    }

    fn choose(&self, platform: &Coordinate, current: &mut Option<Version>, next: &Version) {
        let replace = match current {
            None => true,
            Some(last) => next > last && !self.is_pin(platform, last),
        };
        if replace {
            *current = Some(next.clone());
        }
    }

    fn marker(&self, chosen: &BTreeMap<Coordinate, Version>) -> Coordinate {
        if chosen.contains_key(&self.pinned) {
            self.pinned.clone()
        } else {
            self.fallback.clone()
        }
    }

    fn document(&self, chosen: &BTreeMap<Coordinate, Version>) -> Result<DefaultPlatforms> {
        chosen
            .iter()
            .fold(
                DefaultPlatforms::builder().default_platform(self.marker(chosen)),
                |builder, (platform, version)| builder.add_platform(platform, version),
            )
            .build()
    }

    /// Chosen version per platform for every core that has platform releases
    pub fn select(&self, registry: &Registry) -> BTreeMap<CoreVersion, BTreeMap<Coordinate, Version>> {
        let mut per_core: BTreeMap<CoreVersion, BTreeMap<Coordinate, Option<Version>>> =
            BTreeMap::new();
        for platform in &registry.platforms {
            let mut releases: Vec<_> = platform.releases.iter().collect();
            releases.sort_by(|a, b| a.version.cmp(&b.version));
            for release in releases {
                let current = per_core
                    .entry(release.quarkus_core.clone())
                    .or_default()
                    .entry(platform.id.clone())
                    .or_default();
                self.choose(&platform.id, current, &release.version);
            }
        }
        per_core
            .into_iter()
            .map(|(core, platforms)| {
                let chosen = platforms
                    .into_iter()
                    .filter_map(|(id, version)| version.map(|v| (id, v)))
                    .collect();
                (core, chosen)
            })
            .collect()
    }

    /// A default-platforms document per core version
    pub fn per_core(&self, registry: &Registry) -> Result<BTreeMap<CoreVersion, DefaultPlatforms>> {
        self.select(registry)
            .into_iter()
            .map(|(core, chosen)| {
                debug!("Core {}: {} default platform candidates", core, chosen.len());
                self.document(&chosen).map(|doc| (core, doc))
            })
            .collect()
    }

    /// The latest release of every platform regardless of core version.
    ///
    /// `None` when the registry has no platform releases at all. A pinned
    /// version that the pinned platform never released is an error.
    pub fn latest_across(&self, registry: &Registry) -> Result<Option<DefaultPlatforms>> {
        let mut chosen = BTreeMap::new();
        for platform in &registry.platforms {
            if platform.id == self.pinned {
                if let Some(pin) = &self.pinned_version {
                    if !platform.releases.iter().any(|r| &r.version == pin) {
                        return Err(CatalogError::InconsistentDefault {
                            platform: platform.id.to_string(),
                            reason: format!("failed to locate the specified default version {}", pin),
                        });
                    }
                }
            }

            let mut releases: Vec<_> = platform.releases.iter().collect();
            releases.sort_by(|a, b| a.version.cmp(&b.version));
            let mut current = None;
            for release in releases {
                self.choose(&platform.id, &mut current, &release.version);
            }
            if let Some(version) = current {
                chosen.insert(platform.id.clone(), version);
            }
        }

        if chosen.is_empty() {
            return Ok(None);
        }
        self.document(&chosen).map(Some)
    }
}
