//! Checksum utilities for deployed artifacts

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{CatalogError, Result};

pub const SHA256_EXTENSION: &str = "sha256";

/// SHA256 checksum of an artifact file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| CatalogError::io(path, e))?;
        Ok(Self::from_bytes(&data))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that a file matches this checksum
    pub fn verify_file(&self, path: &Path) -> Result<bool> {
        Ok(Self::from_file(path)? == *self)
    }

    /// Write `<file>.sha256` next to `file`, returning the sidecar path
    pub fn write_sidecar(file: &Path) -> Result<PathBuf> {
        let checksum = Self::from_file(file)?;
        let mut name = file.as_os_str().to_owned();
        name.push(".");
        name.push(SHA256_EXTENSION);
        let sidecar = PathBuf::from(name);
        fs::write(&sidecar, checksum.as_str()).map_err(|e| CatalogError::io(&sidecar, e))?;
        Ok(sidecar)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_checksum_consistency() {
        let content = br#"{"platforms": []}"#;
        assert_eq!(Checksum::from_bytes(content), Checksum::from_bytes(content));
        assert_ne!(Checksum::from_bytes(content), Checksum::from_bytes(b"{}"));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            Checksum::from_bytes(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sidecar() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("catalog-1.0-SNAPSHOT.json");
        fs::write(&file, "{}").unwrap();

        let sidecar = Checksum::write_sidecar(&file).unwrap();
        assert_eq!(sidecar, dir.path().join("catalog-1.0-SNAPSHOT.json.sha256"));

        let stored = Checksum(fs::read_to_string(&sidecar).unwrap());
        assert!(stored.verify_file(&file).unwrap());
    }
}
