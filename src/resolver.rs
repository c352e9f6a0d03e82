//! BOM resolution
//!
//! The indexer asks an [`ArtifactResolver`] which extensions a platform BOM
//! pins. The bundled implementation reads the platform's descriptor JSON
//! artifact (`<groupId>:<artifactId>-descriptor-json:<version>`) from a
//! local artifact cache.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::artifact::ArtifactCoords;
use crate::model::Coordinate;
use crate::version::Version;

const DESCRIPTOR_SUFFIX: &str = "-descriptor-json";

/// An extension version pinned by a platform BOM
#[derive(Debug, Clone, PartialEq)]
pub struct PinnedExtension {
    pub coordinate: Coordinate,
    pub version: Version,
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PinnedExtension {
    pub fn new(coordinate: Coordinate, version: impl Into<Version>) -> Self {
        Self {
            coordinate,
            version: version.into(),
            name: None,
            description: None,
            metadata: serde_json::Map::new(),
        }
    }
}

/// Resolves a platform BOM to the extensions it pins
pub trait ArtifactResolver {
    fn resolve_bom(&self, bom: &Coordinate, version: &Version) -> anyhow::Result<Vec<PinnedExtension>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BomDescriptor {
    #[serde(default)]
    extensions: Vec<DescriptorExtension>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DescriptorExtension {
    group_id: String,
    artifact_id: String,
    #[serde(default)]
    version: Option<Version>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// Reads BOM descriptors from a local artifact cache directory
pub struct LocalRepositoryResolver {
    root: PathBuf,
}

impl LocalRepositoryResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Location of the descriptor artifact for a BOM
    pub fn descriptor_path(&self, bom: &Coordinate, version: &Version) -> PathBuf {
        let coords = ArtifactCoords::new(
            &bom.group_id,
            format!("{}{}", bom.artifact_id, DESCRIPTOR_SUFFIX),
            "json",
            version.as_str(),
        );
        self.root.join(coords.repository_path())
    }
}

impl ArtifactResolver for LocalRepositoryResolver {
    fn resolve_bom(&self, bom: &Coordinate, version: &Version) -> anyhow::Result<Vec<PinnedExtension>> {
        let path = self.descriptor_path(bom, version);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read platform descriptor {}", path.display()))?;
        let descriptor: BomDescriptor = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse platform descriptor {}", path.display()))?;

        descriptor
            .extensions
            .into_iter()
            .map(|e| -> anyhow::Result<PinnedExtension> {
                let coordinate = Coordinate::validated(&e.group_id, &e.artifact_id)
                    .map_err(anyhow::Error::msg)?;
                Ok(PinnedExtension {
                    coordinate,
                    version: e.version.unwrap_or_else(|| version.clone()),
                    name: e.name,
                    description: e.description,
                    metadata: e.metadata,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_from_local_repository() {
        let dir = tempdir().unwrap();
        let resolver = LocalRepositoryResolver::new(dir.path());
        let bom = Coordinate::new("io.quarkus", "quarkus-bom");
        let version = Version::new("1.0");

        let path = resolver.descriptor_path(&bom, &version);
        assert!(path.ends_with("io/quarkus/quarkus-bom-descriptor-json/1.0/quarkus-bom-descriptor-json-1.0.json"));

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"extensions": [
                {"group-id": "io.quarkus", "artifact-id": "quarkus-resteasy", "name": "RESTEasy"},
                {"group-id": "io.quarkus", "artifact-id": "quarkus-arc", "version": "1.0.1"}
            ]}"#,
        )
        .unwrap();

        let pinned = resolver.resolve_bom(&bom, &version).unwrap();
        assert_eq!(pinned.len(), 2);
        assert_eq!(pinned[0].version, Version::new("1.0"));
        assert_eq!(pinned[0].name.as_deref(), Some("RESTEasy"));
        assert_eq!(pinned[1].version, Version::new("1.0.1"));
    }

    #[test]
    fn test_missing_descriptor_fails() {
        let dir = tempdir().unwrap();
        let resolver = LocalRepositoryResolver::new(dir.path());
        let err = resolver
            .resolve_bom(&Coordinate::new("io.quarkus", "quarkus-bom"), &Version::new("9.9"))
            .unwrap_err();
        assert!(err.to_string().contains("quarkus-bom-descriptor-json-9.9.json"));
    }
}
