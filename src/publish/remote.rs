//! Remote repository collaborators
//!
//! [`FileDeployer`] deploys to repositories reachable through the file
//! system (`file://` URLs or plain directory paths). [`SettingsSession`]
//! answers authentication and proxy lookups from the `[deploy]` section
//! of the configuration.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use regex::Regex;
use tracing::{debug, info};

use super::{
    ArtifactDeployer, Authentication, AuthenticationSelector, Proxy, ProxySelector, RemoteRepository, Session,
};
use crate::artifact::Artifact;
use crate::checksum::Checksum;
use crate::config::{DeployConfig, ProxyConfig};

/// Deploys artifacts by copying them into a repository directory
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDeployer;

impl FileDeployer {
    pub fn new() -> Self {
        Self
    }

    /// Directory behind a repository URL. Anything that does not parse as
    /// a URL is taken as a directory path.
    pub fn repository_root(repository: &RemoteRepository) -> anyhow::Result<PathBuf> {
        let Some(url) = repository.parsed_url() else {
            return Ok(PathBuf::from(&repository.url));
        };
        if url.scheme() != "file" {
            bail!(
                "Unsupported protocol {} for repository {} ({})",
                url.scheme(),
                repository.id,
                repository.url
            );
        }
        url.to_file_path()
            .map_err(|()| anyhow!("Repository {} has no local path: {}", repository.id, repository.url))
    }
}

impl ArtifactDeployer for FileDeployer {
    fn deploy(&self, repository: &RemoteRepository, artifacts: &[Artifact]) -> anyhow::Result<()> {
        let root = Self::repository_root(repository)?;
        debug!(
            "Deploying to {}: authentication={}, proxy={}",
            repository.id,
            repository.authentication.is_some(),
            repository.proxy.is_some()
        );

        for artifact in artifacts {
            let target = root.join(artifact.coords.repository_path());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let checksum = Checksum::from_file(&artifact.file)?;
            fs::copy(&artifact.file, &target).with_context(|| {
                format!("Failed to copy {} to {}", artifact.file.display(), target.display())
            })?;
            if !checksum.verify_file(&target)? {
                bail!("Checksum mismatch for {} after upload to {}", artifact.coords, target.display());
            }
            Checksum::write_sidecar(&target)?;
            info!("Uploaded {} to {}", artifact.coords, repository.id);
        }
        Ok(())
    }
}

/// Credentials by repository id
#[derive(Debug, Default, Clone)]
pub struct ServerAuthentication {
    servers: HashMap<String, Authentication>,
}

impl ServerAuthentication {
    pub fn new(servers: impl IntoIterator<Item = (String, Authentication)>) -> Self {
        Self {
            servers: servers.into_iter().collect(),
        }
    }
}

impl AuthenticationSelector for ServerAuthentication {
    fn authentication(&self, repository: &RemoteRepository) -> Option<Authentication> {
        self.servers.get(&repository.id).cloned()
    }
}

/// A single configured proxy with its bypass list
#[derive(Debug, Default, Clone)]
pub struct ConfiguredProxy {
    proxy: Option<Proxy>,
    non_proxy_hosts: Vec<Regex>,
}

impl ConfiguredProxy {
    pub fn new(config: Option<&ProxyConfig>) -> Self {
        let Some(config) = config else {
            return Self::default();
        };
        let authentication = config.username.as_ref().map(|username| Authentication {
            username: username.clone(),
            password: config.password.clone().unwrap_or_default(),
        });
        Self {
            proxy: Some(Proxy {
                protocol: config.protocol.to_ascii_lowercase(),
                host: config.host.clone(),
                port: config.port,
                authentication,
            }),
            non_proxy_hosts: config
                .non_proxy_hosts
                .as_deref()
                .map(host_patterns)
                .unwrap_or_default(),
        }
    }

    fn bypasses(&self, host: &str) -> bool {
        self.non_proxy_hosts.iter().any(|p| p.is_match(host))
    }
}

impl ProxySelector for ConfiguredProxy {
    fn proxy(&self, repository: &RemoteRepository) -> Option<Proxy> {
        let proxy = self.proxy.as_ref()?;
        if repository.protocol().as_deref() != Some(proxy.protocol.as_str()) {
            return None;
        }
        let host = repository.host()?;
        if self.bypasses(&host) {
            return None;
        }
        Some(proxy.clone())
    }
}

/// `*.example.com|localhost` style patterns, matched case-insensitively
fn host_patterns(list: &str) -> Vec<Regex> {
    list.split(['|', ','])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| {
            let pattern = regex::escape(p).replace(r"\*", ".*");
            Regex::new(&format!("(?i)^{}$", pattern)).ok()
        })
        .collect()
}

/// Session backed by the `[deploy]` configuration section
#[derive(Debug, Default, Clone)]
pub struct SettingsSession {
    repository: Option<RemoteRepository>,
    authentication: ServerAuthentication,
    proxy: ConfiguredProxy,
}

impl SettingsSession {
    pub fn from_config(config: &DeployConfig) -> Self {
        Self {
            repository: config
                .repository
                .as_ref()
                .map(|r| RemoteRepository::new(&r.id, &r.url)),
            authentication: ServerAuthentication::new(config.servers.iter().map(|s| {
                (
                    s.id.clone(),
                    Authentication {
                        username: s.username.clone(),
                        password: s.password.clone(),
                    },
                )
            })),
            proxy: ConfiguredProxy::new(config.proxy.as_ref()),
        }
    }
}

impl Session for SettingsSession {
    fn authentication_selector(&self) -> &dyn AuthenticationSelector {
        &self.authentication
    }

    fn proxy_selector(&self) -> &dyn ProxySelector {
        &self.proxy
    }

    fn distribution_repository(&self) -> Option<RemoteRepository> {
        self.repository.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{CatalogCoordinates, Packager};
    use crate::config::{DistributionRepositoryConfig, ServerConfig};
    use tempfile::tempdir;

    fn deploy_config() -> DeployConfig {
        DeployConfig {
            repository: Some(DistributionRepositoryConfig {
                id: "snapshots".to_string(),
                url: "https://repo.example.com/snapshots".to_string(),
            }),
            servers: vec![ServerConfig {
                id: "snapshots".to_string(),
                username: "deployer".to_string(),
                password: "secret".to_string(),
            }],
            proxy: Some(ProxyConfig {
                protocol: "https".to_string(),
                host: "proxy.example.com".to_string(),
                port: 3128,
                username: None,
                password: None,
                non_proxy_hosts: Some("localhost|*.internal.example.com".to_string()),
            }),
        }
    }

    #[test]
    fn test_session_lookups() {
        let session = SettingsSession::from_config(&deploy_config());
        let repository = session.distribution_repository().unwrap();
        assert_eq!(repository.id, "snapshots");

        let auth = session.authentication_selector().authentication(&repository).unwrap();
        assert_eq!(auth.username, "deployer");

        let proxy = session.proxy_selector().proxy(&repository).unwrap();
        assert_eq!(proxy.host, "proxy.example.com");
        assert_eq!(proxy.port, 3128);

        let other = RemoteRepository::new("releases", "https://repo.example.com/releases");
        assert!(session.authentication_selector().authentication(&other).is_none());
    }

    #[test]
    fn test_proxy_bypass() {
        let session = SettingsSession::from_config(&deploy_config());
        let selector = session.proxy_selector();
        assert!(selector
            .proxy(&RemoteRepository::new("a", "https://nexus.INTERNAL.example.com/repo"))
            .is_none());
        assert!(selector.proxy(&RemoteRepository::new("b", "https://localhost:8081/repo")).is_none());
        // protocol mismatch
        assert!(selector.proxy(&RemoteRepository::new("c", "http://repo.example.com")).is_none());
        assert!(selector.proxy(&RemoteRepository::new("d", "/srv/repo")).is_none());
        assert!(selector.proxy(&RemoteRepository::new("e", "https://[::1]:8443/repo")).is_some());
    }

    #[test]
    fn test_file_deployer_writes_checksums() {
        let work = tempdir().unwrap();
        let remote = tempdir().unwrap();
        let coords = CatalogCoordinates::new("io.quarkus.registry", "quarkus-platforms").unversioned();
        let unit = Packager::new().package(work.path(), coords, b"{}").unwrap();

        let url = format!("file://{}", remote.path().display());
        let repository = RemoteRepository::new("local-remote", url);
        FileDeployer::new().deploy(&repository, &unit.artifacts()).unwrap();

        let json = remote
            .path()
            .join("io/quarkus/registry/quarkus-platforms/1.0-SNAPSHOT/quarkus-platforms-1.0-SNAPSHOT.json");
        assert_eq!(fs::read(&json).unwrap(), b"{}");
        assert!(json.with_extension("pom").exists());
        let sidecar = fs::read_to_string(format!("{}.sha256", json.display())).unwrap();
        assert_eq!(sidecar, Checksum::from_bytes(b"{}").as_str());
    }

    #[cfg(unix)]
    #[test]
    fn test_repository_root_paths() {
        let root = |url: &str| FileDeployer::repository_root(&RemoteRepository::new("r", url)).unwrap();
        assert_eq!(root("file:///srv/repo"), PathBuf::from("/srv/repo"));
        assert_eq!(root("file://localhost/srv/repo"), PathBuf::from("/srv/repo"));
        assert_eq!(root("FILE:///srv/my%20repo"), PathBuf::from("/srv/my repo"));
        assert_eq!(root("/srv/plain"), PathBuf::from("/srv/plain"));
        assert_eq!(root("target/remote"), PathBuf::from("target/remote"));

        let remote_host = RemoteRepository::new("r", "file://fileserver/share/repo");
        assert!(FileDeployer::repository_root(&remote_host).is_err());
    }

    #[test]
    fn test_unsupported_protocol() {
        let repository = RemoteRepository::new("central", "https://repo.example.com/maven2");
        let err = FileDeployer::new().deploy(&repository, &[]).unwrap_err();
        assert!(err.to_string().contains("Unsupported protocol"));
    }
}
