//! Catalog serialization
//!
//! Writes the JSON documents of a run. Field naming and empty-field
//! elision come from the serde attributes on the model types; this module
//! owns the output layout:
//!
//! ```text
//! <output>/
//! ├── registry.json              full registry
//! ├── versions.json              core-versions index
//! ├── default-platforms.json     latest release of every platform
//! └── <core>/                    core version, -SNAPSHOT rewritten to -DEV
//!     ├── registry.json          version-scoped registry
//!     └── catalog.json           platform descriptor
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::artifact::rewrite_snapshot_suffix;
use crate::error::{CatalogError, Result};
use crate::version::CoreVersion;

pub const REGISTRY_FILE: &str = "registry.json";
pub const VERSIONS_FILE: &str = "versions.json";
pub const DEFAULT_PLATFORMS_FILE: &str = "default-platforms.json";
pub const CATALOG_FILE: &str = "catalog.json";

/// Serializes documents to bytes and files
#[derive(Debug, Clone, Copy)]
pub struct CatalogWriter {
    pretty: bool,
}

impl Default for CatalogWriter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl CatalogWriter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Serialize a document. `path` only labels the error.
    pub fn to_bytes<T: Serialize>(&self, value: &T, path: &Path) -> Result<Vec<u8>> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        result.map_err(|source| CatalogError::Serialize {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialize a document to `path`, creating parent directories
    pub fn write<T: Serialize>(&self, value: &T, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(value, path)?;
        write_file(path, &bytes)?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Write bytes to `path`, creating its parent directories
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| CatalogError::io(path, e))
}

/// Directory name used for a core version's documents and artifacts
pub fn version_dir_name(core: &CoreVersion) -> String {
    rewrite_snapshot_suffix(core.as_str())
}

/// Paths of the split output layout rooted at `root`
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    pub fn versions(&self) -> PathBuf {
        self.root.join(VERSIONS_FILE)
    }

    pub fn default_platforms(&self) -> PathBuf {
        self.root.join(DEFAULT_PLATFORMS_FILE)
    }

    pub fn version_dir(&self, core: &CoreVersion) -> PathBuf {
        self.root.join(version_dir_name(core))
    }

    pub fn version_registry(&self, core: &CoreVersion) -> PathBuf {
        self.version_dir(core).join(REGISTRY_FILE)
    }

    pub fn version_catalog(&self, core: &CoreVersion) -> PathBuf {
        self.version_dir(core).join(CATALOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registry;
    use crate::version::Version;
    use tempfile::tempdir;

    #[test]
    fn test_layout_rewrites_snapshot() {
        let layout = OutputLayout::new("/out");
        assert_eq!(
            layout.version_catalog(&Version::new("999-SNAPSHOT")),
            PathBuf::from("/out/999-DEV/catalog.json")
        );
        assert_eq!(
            layout.version_dir(&Version::new("2.0.0.Final")),
            PathBuf::from("/out/2.0.0.Final")
        );
    }

    #[test]
    fn test_write_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/registry.json");
        let writer = CatalogWriter::default();

        writer.write(&Registry::default(), &path).unwrap();
        let first = fs::read(&path).unwrap();
        writer.write(&Registry::default(), &path).unwrap();
        assert_eq!(first, fs::read(&path).unwrap());
        assert_eq!(String::from_utf8(first).unwrap(), "{}");
    }
}
