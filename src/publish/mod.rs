//! Publishing
//!
//! Installs every publish unit into the local artifact cache and, in deploy
//! mode, deploys the installed artifacts to the distribution repository.
//! Units are handled one at a time: install, then deploy, then the next
//! unit. The first failure stops the run.

pub mod local;
pub mod remote;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::artifact::{Artifact, PublishUnit};
use crate::error::{CatalogError, Result};
use crate::pipeline::Warning;

pub use local::LocalRepositoryInstaller;
pub use remote::{FileDeployer, SettingsSession};

/// How far a run goes after emitting its documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    /// Emit documents only
    #[default]
    None,
    /// Emit and install to the local artifact cache
    Install,
    /// Emit, install and deploy to the distribution repository
    Deploy,
}

impl Goal {
    pub fn installs(self) -> bool {
        matches!(self, Goal::Install | Goal::Deploy)
    }

    pub fn deploys(self) -> bool {
        matches!(self, Goal::Deploy)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Goal::None => "none",
            Goal::Install => "install",
            Goal::Deploy => "deploy",
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Authentication {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub authentication: Option<Authentication>,
}

/// A remote artifact repository and the credentials used to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    pub authentication: Option<Authentication>,
    pub proxy: Option<Proxy>,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            authentication: None,
            proxy: None,
        }
    }

    /// The repository URL, or `None` when it is a plain path
    pub fn parsed_url(&self) -> Option<Url> {
        Url::parse(&self.url).ok()
    }

    /// URL scheme, lower-cased; `None` for plain paths
    pub fn protocol(&self) -> Option<String> {
        self.parsed_url().map(|url| url.scheme().to_string())
    }

    /// Host part of the URL, if it has one
    pub fn host(&self) -> Option<String> {
        self.parsed_url()?
            .host_str()
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }
}

pub trait AuthenticationSelector {
    fn authentication(&self, repository: &RemoteRepository) -> Option<Authentication>;
}

pub trait ProxySelector {
    fn proxy(&self, repository: &RemoteRepository) -> Option<Proxy>;
}

/// Ambient settings of the invocation
pub trait Session {
    fn authentication_selector(&self) -> &dyn AuthenticationSelector;
    fn proxy_selector(&self) -> &dyn ProxySelector;
    /// Where deployed artifacts go
    fn distribution_repository(&self) -> Option<RemoteRepository>;
}

/// Installs artifacts into the local artifact cache
pub trait ArtifactInstaller {
    /// Install all artifacts as one request. Returns the installed artifacts,
    /// which may live at different paths than the inputs.
    fn install(&self, artifacts: &[Artifact]) -> anyhow::Result<Vec<Artifact>>;
}

/// Deploys artifacts to a remote repository
pub trait ArtifactDeployer {
    fn deploy(&self, repository: &RemoteRepository, artifacts: &[Artifact]) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub installed: usize,
    pub deployed: usize,
    pub warnings: Vec<Warning>,
}

pub struct Publisher<'a> {
    goal: Goal,
    installer: &'a dyn ArtifactInstaller,
    deployer: &'a dyn ArtifactDeployer,
    session: &'a dyn Session,
}

impl<'a> Publisher<'a> {
    pub fn new(
        goal: Goal,
        installer: &'a dyn ArtifactInstaller,
        deployer: &'a dyn ArtifactDeployer,
        session: &'a dyn Session,
    ) -> Self {
        Self {
            goal,
            installer,
            deployer,
            session,
        }
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    /// Publish `units`, which were packaged under `output_root`
    pub fn publish(&self, output_root: &Path, units: &[PublishUnit]) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        if !self.goal.installs() {
            info!("JSON catalogs are not going to be published");
            return Ok(report);
        }

        if !output_root.is_dir() {
            warn!("{} does not exist or is not a directory", output_root.display());
            report.warnings.push(Warning::MissingOutputRoot {
                path: output_root.to_path_buf(),
            });
            report.warnings.push(Warning::NothingToPublish {
                path: output_root.to_path_buf(),
            });
            return Ok(report);
        }

        if count_version_dirs(output_root)? == 0 || units.is_empty() {
            warn!("Nothing to publish under {}", output_root.display());
            report.warnings.push(Warning::NothingToPublish {
                path: output_root.to_path_buf(),
            });
            return Ok(report);
        }

        for unit in units {
            let installed = self
                .installer
                .install(&unit.artifacts())
                .map_err(|e| CatalogError::Install {
                    artifact: unit.to_string(),
                    message: format!("{:#}", e),
                })?;
            info!("Installed {}", unit);
            report.installed += 1;

            if self.goal.deploys() {
                let repository = self.effective_repository(unit)?;
                self.deployer
                    .deploy(&repository, &installed)
                    .map_err(|e| CatalogError::Deploy {
                        artifact: unit.to_string(),
                        message: format!("{:#}", e),
                    })?;
                info!("Deployed {} to {} ({})", unit, repository.id, repository.url);
                report.deployed += 1;
            }
        }
        Ok(report)
    }

    /// The distribution repository, with authentication and proxy taken
    /// from the session only where the repository has none of its own
    pub fn effective_repository(&self, unit: &PublishUnit) -> Result<RemoteRepository> {
        let mut repository = self
            .session
            .distribution_repository()
            .ok_or_else(|| CatalogError::Deploy {
                artifact: unit.to_string(),
                message: "no distribution repository configured".to_string(),
            })?;
        if repository.authentication.is_none() {
            repository.authentication = self
                .session
                .authentication_selector()
                .authentication(&repository);
        }
        if repository.proxy.is_none() {
            repository.proxy = self.session.proxy_selector().proxy(&repository);
        }
        Ok(repository)
    }
}

fn count_version_dirs(root: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(root).map_err(|e| CatalogError::io(root, e))? {
        let entry = entry.map_err(|e| CatalogError::io(root, e))?;
        if entry.path().is_dir() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_flags() {
        assert!(!Goal::None.installs());
        assert!(Goal::Install.installs() && !Goal::Install.deploys());
        assert!(Goal::Deploy.installs() && Goal::Deploy.deploys());
        assert_eq!(Goal::Deploy.to_string(), "deploy");
    }

    #[test]
    fn test_repository_url_parts() {
        let repo = RemoteRepository::new("releases", "https://user@repo.example.com:8443/maven2");
        assert_eq!(repo.protocol().as_deref(), Some("https"));
        assert_eq!(repo.host().as_deref(), Some("repo.example.com"));

        let ipv6 = RemoteRepository::new("mirror", "HTTP://[::1]:8081/repo");
        assert_eq!(ipv6.protocol().as_deref(), Some("http"));
        assert_eq!(ipv6.host().as_deref(), Some("[::1]"));

        let local = RemoteRepository::new("local", "/tmp/repo");
        assert_eq!(local.protocol(), None);
        assert_eq!(local.host(), None);
        assert_eq!(RemoteRepository::new("f", "file:///tmp/repo").host(), None);
        assert_eq!(RemoteRepository::new("f", "file://localhost/tmp/repo").host(), None);
    }

    #[test]
    fn test_authentication_debug_hides_password() {
        let auth = Authentication {
            username: "deployer".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", auth).contains("hunter2"));
    }
}
