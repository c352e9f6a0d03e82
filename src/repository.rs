//! Repository reader
//!
//! Walks the on-disk catalog repository and returns the raw releases it
//! describes. Layout:
//!
//! ```text
//! <repository>/
//! ├── platforms/**/*.{json,yaml,yml}    one platform release per document
//! ├── extensions/**/*.{json,yaml,yml}   one non-platform extension release per document
//! └── categories.{json,yaml,yml}        optional category list
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CatalogError, Result};
use crate::model::{Category, Coordinate};
use crate::pipeline::Warning;
use crate::version::{CoreVersion, Version};

pub const PLATFORMS_DIR: &str = "platforms";
pub const EXTENSIONS_DIR: &str = "extensions";
const CATEGORIES_FILE: &str = "categories";
const DESCRIPTOR_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// A platform release document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformReleaseDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Version,
    pub quarkus_core_version: CoreVersion,
    #[serde(default)]
    pub compatible_quarkus_core_versions: BTreeSet<CoreVersion>,
}

/// A non-platform extension release document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionReleaseDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Version,
    pub quarkus_core_version: CoreVersion,
    #[serde(default)]
    pub compatible_quarkus_core_versions: BTreeSet<CoreVersion>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawKind {
    Platform(PlatformReleaseDescriptor),
    Extension(ExtensionReleaseDescriptor),
}

/// One parsed descriptor and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RawRelease {
    pub path: PathBuf,
    pub coordinate: Coordinate,
    pub version: Version,
    pub kind: RawKind,
}

impl RawRelease {
    pub fn is_platform(&self) -> bool {
        matches!(self.kind, RawKind::Platform(_))
    }
}

/// Everything read from a repository in one pass
#[derive(Debug, Default)]
pub struct RepositoryInventory {
    pub releases: Vec<RawRelease>,
    pub categories: Vec<Category>,
    pub warnings: Vec<Warning>,
}

impl RepositoryInventory {
    pub fn platform_releases(&self) -> impl Iterator<Item = (&RawRelease, &PlatformReleaseDescriptor)> {
        self.releases.iter().filter_map(|r| match &r.kind {
            RawKind::Platform(d) => Some((r, d)),
            RawKind::Extension(_) => None,
        })
    }

    pub fn extension_releases(&self) -> impl Iterator<Item = (&RawRelease, &ExtensionReleaseDescriptor)> {
        self.releases.iter().filter_map(|r| match &r.kind {
            RawKind::Extension(d) => Some((r, d)),
            RawKind::Platform(_) => None,
        })
    }
}

pub struct RepositoryReader {
    root: PathBuf,
}

impl RepositoryReader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the whole repository.
    ///
    /// Any unparsable document fails the read. A second document for the
    /// same (kind, coordinate, version) replaces the first one and is
    /// reported as a warning.
    pub fn read(&self) -> Result<RepositoryInventory> {
        if !self.root.is_dir() {
            return Err(CatalogError::read(&self.root, "repository directory does not exist"));
        }

        let mut inventory = RepositoryInventory::default();
        let mut seen: HashMap<(bool, Coordinate, Version), usize> = HashMap::new();

        let platform_files = descriptor_files(&self.root.join(PLATFORMS_DIR))?;
        let extension_files = descriptor_files(&self.root.join(EXTENSIONS_DIR))?;

        let parsed = platform_files
            .into_iter()
            .map(|path| parse_platform(&path).map(|r| (path, r)))
            .chain(
                extension_files
                    .into_iter()
                    .map(|path| parse_extension(&path).map(|r| (path, r))),
            );

        for item in parsed {
            let (path, raw) = item?;
            let key = (raw.is_platform(), raw.coordinate.clone(), raw.version.clone());
            match seen.get(&key) {
                Some(&index) => {
                    warn!(
                        "Duplicate descriptor for {}:{} at {}, replacing {}",
                        raw.coordinate,
                        raw.version,
                        path.display(),
                        inventory.releases[index].path.display()
                    );
                    inventory.warnings.push(Warning::DuplicateDescriptor {
                        coordinate: raw.coordinate.clone(),
                        version: raw.version.clone(),
                        path: path.clone(),
                    });
                    inventory.releases[index] = raw;
                }
                None => {
                    seen.insert(key, inventory.releases.len());
                    inventory.releases.push(raw);
                }
            }
        }

        inventory.categories = self.read_categories()?;

        debug!(
            "Read {} releases and {} categories from {}",
            inventory.releases.len(),
            inventory.categories.len(),
            self.root.display()
        );
        Ok(inventory)
    }

    fn read_categories(&self) -> Result<Vec<Category>> {
        for ext in DESCRIPTOR_EXTENSIONS {
            let path = self.root.join(format!("{}.{}", CATEGORIES_FILE, ext));
            if path.is_file() {
                return parse_document(&path);
            }
        }
        Ok(Vec::new())
    }
}

/// Descriptor files under `dir`, sorted by path. A missing dir is empty.
fn descriptor_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            CatalogError::read(path, e)
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if hidden || !has_descriptor_extension(path) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

fn has_descriptor_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| DESCRIPTOR_EXTENSIONS.contains(&e))
}

/// Parse a JSON or YAML document depending on the file extension
fn parse_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| CatalogError::read(path, e))?;
    let is_json = path.extension().map_or(false, |e| e == "json");
    if is_json {
        serde_json::from_str(&content).map_err(|e| CatalogError::read(path, e))
    } else {
        serde_yaml_ng::from_str(&content).map_err(|e| CatalogError::read(path, e))
    }
}

fn parse_platform(path: &Path) -> Result<RawRelease> {
    let descriptor: PlatformReleaseDescriptor = parse_document(path)?;
    let coordinate = Coordinate::validated(&descriptor.group_id, &descriptor.artifact_id)
        .map_err(|e| CatalogError::read(path, e))?;
    debug!("Platform release {}:{} from {}", coordinate, descriptor.version, path.display());
    Ok(RawRelease {
        path: path.to_path_buf(),
        coordinate,
        version: descriptor.version.clone(),
        kind: RawKind::Platform(descriptor),
    })
}

fn parse_extension(path: &Path) -> Result<RawRelease> {
    let descriptor: ExtensionReleaseDescriptor = parse_document(path)?;
    let coordinate = Coordinate::validated(&descriptor.group_id, &descriptor.artifact_id)
        .map_err(|e| CatalogError::read(path, e))?;
    debug!("Extension release {}:{} from {}", coordinate, descriptor.version, path.display());
    Ok(RawRelease {
        path: path.to_path_buf(),
        coordinate,
        version: descriptor.version.clone(),
        kind: RawKind::Extension(descriptor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_subtrees_are_empty() {
        let dir = tempdir().unwrap();
        let inventory = RepositoryReader::new(dir.path()).read().unwrap();
        assert!(inventory.releases.is_empty());
        assert!(inventory.categories.is_empty());
        assert!(inventory.warnings.is_empty());
    }

    #[test]
    fn test_reads_json_and_yaml() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "platforms/io.quarkus/quarkus-bom-1.0.json",
            r#"{"group-id": "io.quarkus", "artifact-id": "quarkus-bom", "version": "1.0", "quarkus-core-version": "2.0"}"#,
        );
        write(
            dir.path(),
            "extensions/foo/1.0.yaml",
            "group-id: io.quarkiverse\nartifact-id: quarkus-foo\nversion: '1.0'\nquarkus-core-version: '2.0'\ncompatible-quarkus-core-versions: ['2.1']\nname: Foo\nmetadata:\n  categories: [web]\n",
        );
        write(
            dir.path(),
            "categories.json",
            r#"[{"id": "web", "name": "Web"}]"#,
        );
        write(dir.path(), "extensions/foo/README.md", "ignored");

        let inventory = RepositoryReader::new(dir.path()).read().unwrap();
        assert_eq!(inventory.releases.len(), 2);
        assert_eq!(inventory.platform_releases().count(), 1);

        let (_, ext) = inventory.extension_releases().next().unwrap();
        assert_eq!(ext.name.as_deref(), Some("Foo"));
        assert!(ext.compatible_quarkus_core_versions.contains(&Version::new("2.1")));
        assert_eq!(inventory.categories[0].id, "web");
    }

    #[test]
    fn test_duplicate_last_writer_wins() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "extensions/a.json",
            r#"{"group-id": "g", "artifact-id": "a", "version": "1.0", "quarkus-core-version": "2.0", "name": "first"}"#,
        );
        write(
            dir.path(),
            "extensions/b.json",
            r#"{"group-id": "g", "artifact-id": "a", "version": "1.0", "quarkus-core-version": "2.0", "name": "second"}"#,
        );

        let inventory = RepositoryReader::new(dir.path()).read().unwrap();
        assert_eq!(inventory.releases.len(), 1);
        let (_, ext) = inventory.extension_releases().next().unwrap();
        assert_eq!(ext.name.as_deref(), Some("second"));
        assert!(matches!(
            inventory.warnings.as_slice(),
            [Warning::DuplicateDescriptor { .. }]
        ));
    }

    #[test]
    fn test_malformed_document_names_path() {
        let dir = tempdir().unwrap();
        write(dir.path(), "platforms/broken.json", "{ not json");

        let err = RepositoryReader::new(dir.path()).read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert!(err.to_string().contains("broken.json"));
    }
}
