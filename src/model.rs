//! Registry data model
//!
//! Everything here is built once by the indexer and treated as immutable
//! afterwards. Projections create new values instead of mutating these.
//! Serialized field names are kebab-case and empty/absent fields are
//! omitted from the JSON output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::version::{CoreVersion, Version};

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid coordinate pattern"))
}

/// The `(groupId, artifactId)` identity of a platform, extension or catalog artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Build a coordinate, rejecting empty ids and characters that cannot
    /// appear in an artifact path
    pub fn validated(group_id: &str, artifact_id: &str) -> Result<Self, String> {
        for (label, value) in [("group id", group_id), ("artifact id", artifact_id)] {
            if !token_pattern().is_match(value) {
                return Err(format!("invalid {}: {:?}", label, value));
            }
        }
        Ok(Self::new(group_id, artifact_id))
    }

    /// Parse `groupId:artifactId`
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.split_once(':') {
            Some((group_id, artifact_id)) => Self::validated(group_id, artifact_id),
            None => Err(format!("expected groupId:artifactId, got {:?}", s)),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A release of a platform or extension against a core version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Release {
    pub version: Version,
    pub quarkus_core: CoreVersion,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub compatible_quarkus_core: BTreeSet<CoreVersion>,
}

/// Platform releases carry no extra data over a plain [`Release`]
pub type PlatformRelease = Release;

impl Release {
    pub fn new(version: impl Into<Version>, quarkus_core: impl Into<CoreVersion>) -> Self {
        Self {
            version: version.into(),
            quarkus_core: quarkus_core.into(),
            compatible_quarkus_core: BTreeSet::new(),
        }
    }

    pub fn with_compatible(mut self, cores: impl IntoIterator<Item = CoreVersion>) -> Self {
        self.compatible_quarkus_core.extend(cores);
        self
    }

    /// Declared core, or one of the cores it is declared compatible with
    pub fn supports(&self, core: &CoreVersion) -> bool {
        &self.quarkus_core == core || self.compatible_quarkus_core.contains(core)
    }
}

/// A curated BOM and all its known releases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Platform {
    pub id: Coordinate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub releases: Vec<PlatformRelease>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionRelease {
    pub release: Release,
    /// Platforms whose BOM pins this release. Empty for non-platform releases.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub platforms: BTreeSet<Coordinate>,
}

impl ExtensionRelease {
    pub fn non_platform(release: Release) -> Self {
        Self {
            release,
            platforms: BTreeSet::new(),
        }
    }

    pub fn is_non_platform(&self) -> bool {
        self.platforms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Extension {
    pub id: Coordinate,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub releases: Vec<ExtensionRelease>,
}

impl Extension {
    /// Category ids listed under `metadata.categories`
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .get("categories")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Known core versions, iterated from the highest to the lowest.
///
/// Each core maps to a string table reserved for downstream tooling; the
/// indexer leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreVersions(BTreeMap<std::cmp::Reverse<CoreVersion>, BTreeMap<String, String>>);

impl CoreVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a core version, keeping any table already attached to it
    pub fn insert(&mut self, core: CoreVersion) {
        self.0.entry(std::cmp::Reverse(core)).or_default();
    }

    pub fn insert_with(&mut self, core: CoreVersion, table: BTreeMap<String, String>) {
        self.0.insert(std::cmp::Reverse(core), table);
    }

    pub fn contains(&self, core: &CoreVersion) -> bool {
        self.0.contains_key(&std::cmp::Reverse(core.clone()))
    }

    pub fn get(&self, core: &CoreVersion) -> Option<&BTreeMap<String, String>> {
        self.0.get(&std::cmp::Reverse(core.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CoreVersion, &BTreeMap<String, String>)> {
        self.0.iter().map(|(k, v)| (&k.0, v))
    }

    pub fn versions(&self) -> impl Iterator<Item = &CoreVersion> {
        self.0.keys().map(|k| &k.0)
    }

    /// A table holding only `core`, with the same inner mapping
    pub fn only(&self, core: &CoreVersion) -> Self {
        let mut scoped = Self::new();
        if let Some(table) = self.get(core) {
            scoped.insert_with(core.clone(), table.clone());
        }
        scoped
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CoreVersions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (core, table) in self.iter() {
            map.serialize_entry(core.as_str(), table)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CoreVersions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CoreVersionsVisitor;

        impl<'de> Visitor<'de> for CoreVersionsVisitor {
            type Value = CoreVersions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of core versions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut versions = CoreVersions::new();
                while let Some((core, table)) =
                    access.next_entry::<String, BTreeMap<String, String>>()?
                {
                    versions.insert_with(Version::new(core), table);
                }
                Ok(versions)
            }
        }

        deserializer.deserialize_map(CoreVersionsVisitor)
    }
}

/// The indexed extension registry
///
/// `platforms`, `extensions` and `categories` are kept sorted by their ids
/// and hold each id at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Registry {
    #[serde(default, skip_serializing_if = "CoreVersions::is_empty")]
    pub core_versions: CoreVersions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Platform>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

impl Registry {
    pub fn platform(&self, id: &Coordinate) -> Option<&Platform> {
        self.platforms.iter().find(|p| &p.id == id)
    }

    pub fn extension(&self, id: &Coordinate) -> Option<&Extension> {
        self.extensions.iter().find(|e| &e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.extensions.is_empty() && self.categories.is_empty()
    }
}
