//! Catalog Publish CLI
//!
//! Indexes a registry repository, writes the JSON catalogs and publishes
//! them to the local artifact cache and the distribution repository.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use quarkus_registry_catalogs::config::DistributionRepositoryConfig;
use quarkus_registry_catalogs::{
    CatalogConfig, CatalogPipeline, FileDeployer, Goal, LocalRepositoryInstaller, LocalRepositoryResolver,
    Publisher, Scope, SettingsSession, Version,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-publish")]
#[command(about = "Generate and publish JSON extension catalogs")]
struct Cli {
    /// Which catalogs to generate and publish
    #[arg(value_enum, default_value_t = Scope::All)]
    scope: Scope,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Registry repository to index
    #[arg(short, long)]
    repository_dir: Option<PathBuf>,

    /// Output directory, or file when --split false
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the per-core-version layout
    #[arg(long)]
    split: Option<bool>,

    /// Publish goal
    #[arg(long, value_enum)]
    goal: Option<Goal>,

    #[arg(long)]
    default_platform_group_id: Option<String>,

    #[arg(long)]
    default_platform_artifact_id: Option<String>,

    /// Pin the default platform to this version
    #[arg(long)]
    default_platform_version: Option<String>,

    #[arg(long)]
    json_group_id: Option<String>,

    #[arg(long)]
    json_artifact_id: Option<String>,

    /// Local artifact cache (default: ~/.m2/repository)
    #[arg(long)]
    local_repository: Option<PathBuf>,

    /// Distribution repository URL (file:// or a directory)
    #[arg(long)]
    deploy_url: Option<String>,

    /// Distribution repository id, used for credential lookup
    #[arg(long, default_value = "registry")]
    deploy_id: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn apply_overrides(cfg: &mut CatalogConfig, cli: &Cli) {
    if let Some(dir) = &cli.repository_dir {
        cfg.repository.dir = Some(dir.clone());
    }
    if let Some(output) = &cli.output {
        cfg.output.path = output.clone();
    }
    if let Some(split) = cli.split {
        cfg.output.split = split;
    }
    if let Some(goal) = cli.goal {
        cfg.publish.goal = goal;
    }
    if let Some(group_id) = &cli.default_platform_group_id {
        cfg.default_platform.group_id = group_id.clone();
    }
    if let Some(artifact_id) = &cli.default_platform_artifact_id {
        cfg.default_platform.artifact_id = artifact_id.clone();
    }
    if let Some(version) = &cli.default_platform_version {
        cfg.default_platform.version = Some(version.clone());
    }
    if let Some(group_id) = &cli.json_group_id {
        cfg.json.group_id = group_id.clone();
    }
    if let Some(artifact_id) = &cli.json_artifact_id {
        cfg.json.artifact_id = artifact_id.clone();
    }
    if let Some(local) = &cli.local_repository {
        cfg.publish.local_repository = Some(local.clone());
    }
    if let Some(url) = &cli.deploy_url {
        cfg.deploy.repository = Some(DistributionRepositoryConfig {
            id: cli.deploy_id.clone(),
            url: url.clone(),
        });
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = CatalogConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut cfg, &cli);
    cfg.validate().context("Invalid configuration")?;

    let options = cfg.pipeline_options(cli.scope)?;
    let local_repository = cfg.local_repository();

    println!("📦 Catalog Publish");
    println!("  Repository: {:?}", options.repository_dir);
    println!("  Output: {:?}", options.output);
    println!("  Scope: {:?}", options.scope);
    println!("  Goal: {}", cfg.publish.goal);
    if let Some(version) = options.default_platform_version.as_ref().map(Version::as_str) {
        println!("  Default platform: {}:{}", options.default_platform, version);
    }
    println!();

    let resolver = LocalRepositoryResolver::new(&local_repository);
    let installer = LocalRepositoryInstaller::new(&local_repository);
    let deployer = FileDeployer::new();
    let session = SettingsSession::from_config(&cfg.deploy);
    let publisher = Publisher::new(cfg.publish.goal, &installer, &deployer, &session);

    let report = CatalogPipeline::new(options, &resolver, publisher).run()?;

    println!("✅ Generated {} documents", report.documents.len());
    println!("   Core versions: {}", report.core_versions.len());
    println!("   Publish units: {}", report.units.len());
    if report.installed > 0 {
        println!("   Installed: {} to {:?}", report.installed, local_repository);
    }
    if report.deployed > 0 {
        println!("   Deployed: {}", report.deployed);
    }
    for warning in &report.warnings {
        println!("⚠️  {}", warning);
    }

    Ok(())
}
