//! Catalog Config CLI
//!
//! View and manage catalog publisher configuration.

use clap::{Parser, Subcommand};
use quarkus_registry_catalogs::CatalogConfig;

#[derive(Parser)]
#[command(name = "catalog-config")]
#[command(about = "View and manage catalog publisher configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: catalogs.toml)
        #[arg(short, long, default_value = "catalogs.toml")]
        output: String,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = CatalogConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Catalog Publisher Configuration\n");
                println!("Repository:");
                println!("  Dir: {:?}", cfg.repository.dir);

                println!("\nOutput:");
                println!("  Path: {:?}", cfg.output.path);
                println!("  Split: {}", cfg.output.split);
                println!("  Pretty: {}", cfg.output.pretty);

                println!("\nDefault platform:");
                println!("  {}:{}", cfg.default_platform.group_id, cfg.default_platform.artifact_id);
                println!("  Pinned version: {:?}", cfg.default_platform.version);
                println!(
                    "  Fallback: {}:{}",
                    cfg.fallback_platform.group_id, cfg.fallback_platform.artifact_id
                );

                println!("\nPlatform catalogs:");
                println!("  {}:{}", cfg.json.group_id, cfg.json.artifact_id);

                println!("\nPublish:");
                println!("  Goal: {}", cfg.publish.goal);
                println!("  Local repository: {:?}", cfg.local_repository());

                if let Some(repository) = &cfg.deploy.repository {
                    println!("\nDeploy:");
                    println!("  Repository: {} ({})", repository.id, repository.url);
                    for server in &cfg.deploy.servers {
                        println!("  Server: {} as {}", server.id, server.username);
                    }
                    if let Some(proxy) = &cfg.deploy.proxy {
                        println!("  Proxy: {}://{}:{}", proxy.protocol, proxy.host, proxy.port);
                    }
                }
            }
        }

        Commands::Init { output } => {
            let cfg = CatalogConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => {
            match CatalogConfig::load_from(config.as_deref()).and_then(|cfg| cfg.validate().map(|_| cfg)) {
                Ok(cfg) => {
                    println!("✅ Configuration is valid");
                    println!("   Repository: {:?}", cfg.repository.dir);
                    println!("   Output: {:?}", cfg.output.path);
                    println!("   Goal: {}", cfg.publish.goal);
                }
                Err(e) => {
                    eprintln!("❌ Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
