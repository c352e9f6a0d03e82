//! Catalog artifacts
//!
//! Every published JSON document becomes a publish unit of two artifacts
//! sharing one coordinate: the JSON itself and a minimal `pom` descriptor.
//! Catalog artifacts always have version `1.0-SNAPSHOT`; the core version
//! they describe is part of the artifact id.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::write_file;
use crate::error::{CatalogError, Result};

pub const CATALOG_ARTIFACT_VERSION: &str = "1.0-SNAPSHOT";
pub const NON_PLATFORM_GROUP_ID: &str = "io.quarkus.registry";
pub const NON_PLATFORM_ARTIFACT_ID: &str = "quarkus-non-platform-extensions";

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";
const DEV_SUFFIX: &str = "-DEV";

/// Replace a trailing `-SNAPSHOT` with `-DEV`.
///
/// Applied to core versions before they are embedded in artifact ids, where
/// a snapshot suffix would clash with the repository's snapshot handling.
pub fn rewrite_snapshot_suffix(core: &str) -> String {
    match core.strip_suffix(SNAPSHOT_SUFFIX) {
        Some(base) => format!("{}{}", base, DEV_SUFFIX),
        None => core.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoords {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: Option<String>,
    /// File extension / artifact type (`json`, `pom`)
    pub extension: String,
    pub version: String,
}

impl ArtifactCoords {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        extension: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: None,
            extension: extension.into(),
            version: version.into(),
        }
    }

    /// Same coordinate, different type
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            ..self.clone()
        }
    }

    /// `{artifactId}-{version}[-{classifier}].{extension}`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Path of the artifact inside a repository directory
    pub fn repository_path(&self) -> PathBuf {
        self.version_path().join(self.file_name())
    }

    /// `{group as dirs}/{artifactId}/{version}`
    pub fn version_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group_id.split('.').collect();
        path.push(&self.artifact_id);
        path.push(&self.version);
        path
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }
}

impl fmt::Display for ArtifactCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}:{}", self.extension, self.version)
    }
}

/// A coordinate bound to a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub coords: ArtifactCoords,
    pub file: PathBuf,
}

impl Artifact {
    pub fn new(coords: ArtifactCoords, file: impl Into<PathBuf>) -> Self {
        Self {
            coords,
            file: file.into(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.coords.fmt(f)
    }
}

/// A JSON artifact and its companion descriptor, published together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishUnit {
    pub primary: Artifact,
    pub companion: Artifact,
}

impl PublishUnit {
    /// Artifacts in install order, descriptor first
    pub fn artifacts(&self) -> Vec<Artifact> {
        vec![self.companion.clone(), self.primary.clone()]
    }
}

impl fmt::Display for PublishUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.primary.fmt(f)
    }
}

pub(crate) fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Minimal `pom` descriptor for a catalog artifact
pub fn render_descriptor(coords: &ArtifactCoords) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <version>{}</version>
  <packaging>pom</packaging>
</project>
"#,
        escape_xml(&coords.group_id),
        escape_xml(&coords.artifact_id),
        escape_xml(&coords.version)
    )
}

/// Coordinate prefix of a family of catalog artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogCoordinates {
    pub group_id: String,
    pub artifact_id: String,
}

impl CatalogCoordinates {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// The fixed prefix of the non-platform catalogs
    pub fn non_platform() -> Self {
        Self::new(NON_PLATFORM_GROUP_ID, NON_PLATFORM_ARTIFACT_ID)
    }

    /// `{group}:{artifact}-{core rewritten}:json:1.0-SNAPSHOT`
    pub fn for_core(&self, core: &str) -> ArtifactCoords {
        ArtifactCoords::new(
            &self.group_id,
            format!("{}-{}", self.artifact_id, rewrite_snapshot_suffix(core)),
            "json",
            CATALOG_ARTIFACT_VERSION,
        )
    }

    /// `{group}:{artifact}:json:1.0-SNAPSHOT`
    pub fn unversioned(&self) -> ArtifactCoords {
        ArtifactCoords::new(&self.group_id, &self.artifact_id, "json", CATALOG_ARTIFACT_VERSION)
    }
}

/// Materializes publish units next to the documents they carry
#[derive(Debug, Default, Clone, Copy)]
pub struct Packager;

impl Packager {
    pub fn new() -> Self {
        Self
    }

    /// Write `content` as the primary artifact of `coords` into `dir`,
    /// together with its descriptor
    pub fn package(&self, dir: &Path, coords: ArtifactCoords, content: &[u8]) -> Result<PublishUnit> {
        let primary_path = dir.join(coords.file_name());
        write_file(&primary_path, content)?;

        let pom = coords.with_extension("pom");
        let pom_path = dir.join(pom.file_name());
        write_file(&pom_path, render_descriptor(&pom).as_bytes())?;

        debug!("Packaged {} in {}", coords, dir.display());
        Ok(PublishUnit {
            primary: Artifact::new(coords, primary_path),
            companion: Artifact::new(pom, pom_path),
        })
    }

    /// Package an existing JSON file
    pub fn package_file(&self, dir: &Path, coords: ArtifactCoords, json: &Path) -> Result<PublishUnit> {
        let content = fs::read(json).map_err(|e| CatalogError::io(json, e))?;
        self.package(dir, coords, &content)
    }
}
