//! Configuration management for the catalog publisher
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (catalogs.toml)
//! - Environment variables (CATALOGS__*)
//!
//! ## Example config file (catalogs.toml):
//! ```toml
//! [repository]
//! dir = "./registry"
//!
//! [output]
//! path = "target/json"
//! split = true
//!
//! [default_platform]
//! group_id = "io.quarkus"
//! artifact_id = "quarkus-bom"
//! version = "1.13.7.Final"
//!
//! [publish]
//! goal = "deploy"
//!
//! [deploy.repository]
//! id = "registry-snapshots"
//! url = "file:///srv/maven/snapshots"
//!
//! [[deploy.servers]]
//! id = "registry-snapshots"
//! username = "deployer"
//! password = "secret"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::artifact::CatalogCoordinates;
use crate::model::Coordinate;
use crate::pipeline::{PipelineOptions, Scope};
use crate::publish::Goal;
use crate::version::Version;

/// Main configuration for a catalog run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Source repository
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Emitted documents
    #[serde(default)]
    pub output: OutputConfig,

    /// Preferred default platform
    #[serde(default)]
    pub default_platform: DefaultPlatformConfig,

    /// Default marker for cores the preferred platform does not cover
    #[serde(default)]
    pub fallback_platform: FallbackPlatformConfig,

    /// Coordinate prefix of the platform catalog artifacts
    #[serde(default)]
    pub json: JsonConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Root of the on-disk catalog repository
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, or file when `split` is off
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Emit the per-core-version layout
    #[serde(default = "default_true")]
    pub split: bool,

    /// Pretty-print JSON
    #[serde(default = "default_true")]
    pub pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultPlatformConfig {
    #[serde(default = "default_platform_group_id")]
    pub group_id: String,

    #[serde(default = "default_platform_artifact_id")]
    pub artifact_id: String,

    /// Pinned default version
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackPlatformConfig {
    #[serde(default = "default_platform_group_id")]
    pub group_id: String,

    #[serde(default = "default_platform_artifact_id")]
    pub artifact_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonConfig {
    #[serde(default = "default_json_group_id")]
    pub group_id: String,

    #[serde(default = "default_json_artifact_id")]
    pub artifact_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub goal: Goal,

    /// Local artifact cache (default: ~/.m2/repository)
    #[serde(default)]
    pub local_repository: Option<PathBuf>,
}

/// Distribution settings backing the deploy session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub repository: Option<DistributionRepositoryConfig>,

    /// Credentials, looked up by repository id
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRepositoryConfig {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_protocol")]
    pub protocol: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// `|`-separated host patterns, `*` wildcards allowed
    #[serde(default)]
    pub non_proxy_hosts: Option<String>,
}

// Default value functions
fn default_output_path() -> PathBuf {
    PathBuf::from("target/json")
}

fn default_true() -> bool {
    true
}

fn default_platform_group_id() -> String {
    "io.quarkus".to_string()
}

fn default_platform_artifact_id() -> String {
    "quarkus-bom".to_string()
}

fn default_json_group_id() -> String {
    "io.quarkus.registry".to_string()
}

fn default_json_artifact_id() -> String {
    "quarkus-platforms".to_string()
}

fn default_proxy_protocol() -> String {
    "http".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            split: true,
            pretty: true,
        }
    }
}

impl Default for DefaultPlatformConfig {
    fn default() -> Self {
        Self {
            group_id: default_platform_group_id(),
            artifact_id: default_platform_artifact_id(),
            version: None,
        }
    }
}

impl Default for FallbackPlatformConfig {
    fn default() -> Self {
        Self {
            group_id: default_platform_group_id(),
            artifact_id: default_platform_artifact_id(),
        }
    }
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            group_id: default_json_group_id(),
            artifact_id: default_json_artifact_id(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["catalogs.toml", ".catalogs.toml", "config/catalogs.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("io", "quarkus", "registry-catalogs") {
            let xdg_config = config_dir.config_dir().join("catalogs.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (CATALOGS__*)
        builder = builder.add_source(
            Environment::with_prefix("CATALOGS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Check coordinates and the deploy section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_platform_coordinate()?;
        self.fallback_platform_coordinate()?;
        self.json_coordinates()?;
        if self.publish.goal.deploys() && self.deploy.repository.is_none() {
            return Err(ConfigError::Message(
                "publish.goal = \"deploy\" requires [deploy.repository]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_platform_coordinate(&self) -> Result<Coordinate, ConfigError> {
        coordinate("default_platform", &self.default_platform.group_id, &self.default_platform.artifact_id)
    }

    pub fn fallback_platform_coordinate(&self) -> Result<Coordinate, ConfigError> {
        coordinate(
            "fallback_platform",
            &self.fallback_platform.group_id,
            &self.fallback_platform.artifact_id,
        )
    }

    pub fn json_coordinates(&self) -> Result<CatalogCoordinates, ConfigError> {
        let c = coordinate("json", &self.json.group_id, &self.json.artifact_id)?;
        Ok(CatalogCoordinates::new(c.group_id, c.artifact_id))
    }

    /// Local artifact cache, `~/.m2/repository` unless configured
    pub fn local_repository(&self) -> PathBuf {
        if let Some(path) = &self.publish.local_repository {
            return path.clone();
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".m2").join("repository"))
            .unwrap_or_else(|| PathBuf::from(".m2/repository"))
    }

    /// Pipeline options for `scope`; fails when no repository is configured
    pub fn pipeline_options(&self, scope: Scope) -> Result<PipelineOptions, ConfigError> {
        let repository_dir = self
            .repository
            .dir
            .clone()
            .ok_or_else(|| ConfigError::NotFound("repository.dir".to_string()))?;

        let mut options = PipelineOptions::new(repository_dir, self.output.path.clone());
        options.split = self.output.split;
        options.pretty = self.output.pretty;
        options.default_platform = self.default_platform_coordinate()?;
        options.default_platform_version = self.default_platform.version.as_deref().map(Version::new);
        options.fallback_platform = self.fallback_platform_coordinate()?;
        options.json = self.json_coordinates()?;
        options.scope = scope;
        Ok(options)
    }
}

fn coordinate(section: &str, group_id: &str, artifact_id: &str) -> Result<Coordinate, ConfigError> {
    Coordinate::validated(group_id, artifact_id)
        .map_err(|e| ConfigError::Message(format!("[{}] {}", section, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert!(config.output.split);
        assert_eq!(config.output.path, PathBuf::from("target/json"));
        assert_eq!(config.json.artifact_id, "quarkus-platforms");
        assert_eq!(config.publish.goal, Goal::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_json_coordinates_match_pipeline_defaults() {
        let config = CatalogConfig::default();
        let json = config.json_coordinates().unwrap();
        assert_eq!(json.group_id, "io.quarkus.registry");
        assert_eq!(json, PipelineOptions::new("repository", "target/json").json);
    }

    #[test]
    fn test_serialize_config() {
        let config = CatalogConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[default_platform]"));
    }

    #[test]
    fn test_partial_sections() {
        let config: CatalogConfig = toml::from_str(
            r#"
            [repository]
            dir = "registry"

            [default_platform]
            version = "1.5"

            [publish]
            goal = "install"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_platform.group_id, "io.quarkus");
        assert_eq!(config.publish.goal, Goal::Install);

        let options = config.pipeline_options(Scope::All).unwrap();
        assert_eq!(options.repository_dir, PathBuf::from("registry"));
        assert_eq!(options.default_platform_version, Some(Version::new("1.5")));
        assert_eq!(options.json.group_id, "io.quarkus.registry");
    }

    #[test]
    fn test_missing_repository_dir() {
        let err = CatalogConfig::default().pipeline_options(Scope::All).unwrap_err();
        assert!(err.to_string().contains("repository.dir"));
    }

    #[test]
    fn test_deploy_requires_repository() {
        let mut config = CatalogConfig::default();
        config.publish.goal = Goal::Deploy;
        assert!(config.validate().is_err());

        config.deploy.repository = Some(DistributionRepositoryConfig {
            id: "snapshots".to_string(),
            url: "file:///tmp/snapshots".to_string(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_coordinate() {
        let mut config = CatalogConfig::default();
        config.json.artifact_id = "bad artifact".to_string();
        assert!(config.validate().is_err());
    }
}
