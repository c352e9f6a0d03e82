//! Error types for catalog generation and publishing

use std::path::PathBuf;

use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Coarse classification of a [`CatalogError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    Index,
    Project,
    Serialize,
    Io,
    Install,
    Deploy,
    Config,
}

/// Catalog pipeline errors. Every variant is fatal for the run.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to resolve BOM {coordinate}:{version}: {message}")]
    Index {
        coordinate: String,
        version: String,
        message: String,
    },

    #[error("Inconsistent default platform {platform}: {reason}")]
    InconsistentDefault { platform: String, reason: String },

    #[error("Projection failed: {0}")]
    Project(String),

    #[error("Failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install {artifact}: {message}")]
    Install { artifact: String, message: String },

    #[error("Failed to deploy {artifact}: {message}")]
    Deploy { artifact: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl CatalogError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Read {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Read { .. } => ErrorKind::Read,
            CatalogError::Index { .. } => ErrorKind::Index,
            CatalogError::InconsistentDefault { .. } | CatalogError::Project(_) => {
                ErrorKind::Project
            }
            CatalogError::Serialize { .. } => ErrorKind::Serialize,
            CatalogError::Io { .. } => ErrorKind::Io,
            CatalogError::Install { .. } => ErrorKind::Install,
            CatalogError::Deploy { .. } => ErrorKind::Deploy,
            CatalogError::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err = CatalogError::InconsistentDefault {
            platform: "io.quarkus:quarkus-bom".to_string(),
            reason: "not present in the list of platforms".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Project);
        assert!(err.to_string().contains("io.quarkus:quarkus-bom"));

        let err = CatalogError::io(
            "out/registry.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("out/registry.json"));
    }
}
