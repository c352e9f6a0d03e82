//! Local artifact cache installer

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::ArtifactInstaller;
use crate::artifact::{escape_xml, Artifact, ArtifactCoords};

pub const LOCAL_METADATA_FILE: &str = "maven-metadata-local.xml";
const STAGING_SUFFIX: &str = ".part";
const BACKUP_SUFFIX: &str = ".bak";

/// Installs artifacts into a `<group>/<artifact>/<version>/` tree
#[derive(Debug, Clone)]
pub struct LocalRepositoryInstaller {
    root: PathBuf,
}

struct Staged {
    part: PathBuf,
    target: PathBuf,
}

/// A target moved into place, with the previous install it replaced
struct Committed {
    target: PathBuf,
    backup: Option<PathBuf>,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Remove a leftover file; a missing one is fine
fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

impl LocalRepositoryInstaller {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `coords` lives once installed
    pub fn path_of(&self, coords: &ArtifactCoords) -> PathBuf {
        self.root.join(coords.repository_path())
    }

    fn stage(&self, artifacts: &[Artifact], staged: &mut Vec<Staged>) -> anyhow::Result<()> {
        for artifact in artifacts {
            let target = self.path_of(&artifact.coords);
            let part = with_suffix(&target, STAGING_SUFFIX);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::copy(&artifact.file, &part).with_context(|| {
                format!("Failed to copy {} for {}", artifact.file.display(), artifact.coords)
            })?;
            staged.push(Staged { part, target });
        }
        Ok(())
    }

    fn commit(staged: &[Staged], committed: &mut Vec<Committed>) -> anyhow::Result<()> {
        for entry in staged {
            let backup = if entry.target.exists() {
                let backup = with_suffix(&entry.target, BACKUP_SUFFIX);
                fs::rename(&entry.target, &backup)
                    .with_context(|| format!("Failed to move aside {}", entry.target.display()))?;
                Some(backup)
            } else {
                None
            };
            let moved = fs::rename(&entry.part, &entry.target);
            committed.push(Committed {
                target: entry.target.clone(),
                backup,
            });
            moved.with_context(|| format!("Failed to move {} into place", entry.target.display()))?;
        }
        Ok(())
    }

    /// Drop staged files and put every replaced install back
    fn rollback(staged: &[Staged], committed: &[Committed]) {
        for entry in staged {
            discard(&entry.part);
        }
        for entry in committed.iter().rev() {
            discard(&entry.target);
            if let Some(backup) = &entry.backup {
                if let Err(e) = fs::rename(backup, &entry.target) {
                    warn!("Failed to restore {}: {}", entry.target.display(), e);
                }
            }
        }
    }

    fn release(committed: &[Committed]) {
        for backup in committed.iter().filter_map(|c| c.backup.as_deref()) {
            discard(backup);
        }
    }

    fn write_metadata(&self, artifacts: &[Artifact], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut by_version: BTreeMap<PathBuf, Vec<&ArtifactCoords>> = BTreeMap::new();
        for artifact in artifacts.iter().filter(|a| a.coords.is_snapshot()) {
            by_version
                .entry(artifact.coords.version_path())
                .or_default()
                .push(&artifact.coords);
        }
        for (version_path, coords) in by_version {
            let path = self.root.join(version_path).join(LOCAL_METADATA_FILE);
            fs::write(&path, render_local_metadata(&coords, now))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Updated {}", path.display());
        }
        Ok(())
    }
}

impl ArtifactInstaller for LocalRepositoryInstaller {
    fn install(&self, artifacts: &[Artifact]) -> anyhow::Result<Vec<Artifact>> {
        let mut staged = Vec::new();
        let mut committed = Vec::new();
        let result = self
            .stage(artifacts, &mut staged)
            .and_then(|_| Self::commit(&staged, &mut committed));
        if let Err(e) = result {
            Self::rollback(&staged, &committed);
            return Err(e);
        }
        Self::release(&committed);

        let installed: Vec<Artifact> = artifacts
            .iter()
            .map(|a| Artifact::new(a.coords.clone(), self.path_of(&a.coords)))
            .collect();
        self.write_metadata(&installed, Utc::now())?;
        for artifact in &installed {
            debug!("Installed {} to {}", artifact.coords, artifact.file.display());
        }
        Ok(installed)
    }
}

/// Snapshot metadata for one `<group>/<artifact>/<version>` directory
fn render_local_metadata(coords: &[&ArtifactCoords], now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d%H%M%S").to_string();
    let Some(first) = coords.first() else {
        return String::new();
    };

    let mut snapshot_versions = String::new();
    for c in coords {
        snapshot_versions.push_str("      <snapshotVersion>\n");
        if let Some(classifier) = &c.classifier {
            snapshot_versions.push_str(&format!(
                "        <classifier>{}</classifier>\n",
                escape_xml(classifier)
            ));
        }
        snapshot_versions.push_str(&format!(
            "        <extension>{}</extension>\n        <value>{}</value>\n        <updated>{}</updated>\n",
            escape_xml(&c.extension),
            escape_xml(&c.version),
            stamp
        ));
        snapshot_versions.push_str("      </snapshotVersion>\n");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <version>{}</version>
  <versioning>
    <snapshot>
      <localCopy>true</localCopy>
    </snapshot>
    <lastUpdated>{}</lastUpdated>
    <snapshotVersions>
{}    </snapshotVersions>
  </versioning>
</metadata>
"#,
        escape_xml(&first.group_id),
        escape_xml(&first.artifact_id),
        escape_xml(&first.version),
        stamp,
        snapshot_versions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{CatalogCoordinates, Packager};
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_install_unit() {
        let work = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let coords = CatalogCoordinates::non_platform().for_core("2.0");
        let unit = Packager::new().package(work.path(), coords, b"{}").unwrap();

        let installer = LocalRepositoryInstaller::new(cache.path());
        let installed = installer.install(&unit.artifacts()).unwrap();

        assert_eq!(installed.len(), 2);
        let version_dir = cache
            .path()
            .join("io/quarkus/registry/quarkus-non-platform-extensions-2.0/1.0-SNAPSHOT");
        assert_eq!(
            installed[1].file,
            version_dir.join("quarkus-non-platform-extensions-2.0-1.0-SNAPSHOT.json")
        );
        assert_eq!(fs::read(&installed[1].file).unwrap(), b"{}");
        assert!(installed[0].file.exists());

        let metadata = fs::read_to_string(version_dir.join(LOCAL_METADATA_FILE)).unwrap();
        assert!(metadata.contains("<extension>json</extension>"));
        assert!(metadata.contains("<extension>pom</extension>"));
    }

    #[test]
    fn test_failed_install_leaves_nothing() {
        let work = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let coords = CatalogCoordinates::non_platform().for_core("2.0");
        let mut unit = Packager::new().package(work.path(), coords, b"{}").unwrap();
        unit.primary.file = work.path().join("missing.json");

        let installer = LocalRepositoryInstaller::new(cache.path());
        let err = installer.install(&unit.artifacts()).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json"));

        let pom = installer.path_of(&unit.companion.coords);
        assert!(!pom.exists());
        assert!(!with_suffix(&pom, STAGING_SUFFIX).exists());
    }

    #[test]
    fn test_reinstall_replaces_previous_files() {
        let work = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let installer = LocalRepositoryInstaller::new(cache.path());
        let coords = CatalogCoordinates::non_platform().for_core("2.0");

        let old = Packager::new().package(work.path(), coords.clone(), b"{\"old\":true}").unwrap();
        installer.install(&old.artifacts()).unwrap();
        let new = Packager::new().package(work.path(), coords, b"{}").unwrap();
        let installed = installer.install(&new.artifacts()).unwrap();

        for artifact in &installed {
            assert!(!with_suffix(&artifact.file, BACKUP_SUFFIX).exists());
        }
        assert_eq!(fs::read(&installed[1].file).unwrap(), b"{}");
    }

    #[test]
    fn test_rollback_restores_previous_install() {
        let cache = tempdir().unwrap();
        let json = cache.path().join("catalog-1.0.json");
        let pom = cache.path().join("catalog-1.0.pom");
        fs::write(&json, "old json").unwrap();
        fs::write(&pom, "old pom").unwrap();

        // the pom was never staged, so its move fails after the json replaced the old one
        let json_part = with_suffix(&json, STAGING_SUFFIX);
        fs::write(&json_part, "new json").unwrap();
        let staged = vec![
            Staged {
                part: json_part.clone(),
                target: json.clone(),
            },
            Staged {
                part: with_suffix(&pom, STAGING_SUFFIX),
                target: pom.clone(),
            },
        ];
        let mut committed = Vec::new();
        assert!(LocalRepositoryInstaller::commit(&staged, &mut committed).is_err());
        LocalRepositoryInstaller::rollback(&staged, &committed);

        assert_eq!(fs::read_to_string(&json).unwrap(), "old json");
        assert_eq!(fs::read_to_string(&pom).unwrap(), "old pom");
        assert!(!json_part.exists());
        assert!(!with_suffix(&json, BACKUP_SUFFIX).exists());
        assert!(!with_suffix(&pom, BACKUP_SUFFIX).exists());
    }

    #[test]
    fn test_metadata_stamp() {
        let coords = ArtifactCoords::new("io.quarkus.registry", "quarkus-platforms", "json", "1.0-SNAPSHOT");
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let xml = render_local_metadata(&[&coords], now);
        assert!(xml.contains("<lastUpdated>20240301123005</lastUpdated>"));
        assert!(xml.contains("<artifactId>quarkus-platforms</artifactId>"));
    }
}
