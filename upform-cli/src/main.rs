//! upform CLI
//!
//! Command-line client for form-API object uploads.
//!
//! # Commands
//! - `put` - Upload a file in a single request
//! - `slice` - Upload a file block by block (re-run to resume)
//! - `hash` - Print the MD5 digest of a file
//! - `config` - Show or edit configuration
//!
//! # Configuration
//! Config file: ~/.upform/config.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod symbols;

use commands::{hash, upload};
use upform_client::{ClientConfig, Route};

#[derive(Parser)]
#[command(name = "upform")]
#[command(about = "Form API upload client")]
#[command(version)]
struct Cli {
    /// Target bucket (overrides config file)
    #[arg(long, global = true, env = "UPFORM_BUCKET")]
    bucket: Option<String>,

    /// Form API secret (overrides config file)
    #[arg(long, global = true, env = "UPFORM_KEY", hide_env_values = true)]
    key: Option<String>,

    /// API host: auto, telecom, cnc, ctt or multi
    #[arg(long, global = true, value_parser = config::parse_route)]
    route: Option<Route>,

    /// Base URL overriding the routed host, e.g. http://127.0.0.1:9000
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Slice size in bytes
    #[arg(long, global = true)]
    block_size: Option<u64>,

    /// Blocks uploaded in parallel
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file in a single multipart request
    Put {
        /// Local file
        file: PathBuf,

        /// Remote path, e.g. /photos/cat.jpg
        remote: String,

        /// Send the payload digest as content-md5
        #[arg(long)]
        md5: bool,

        /// Content type recorded by the server
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Upload a file block by block; re-running resumes
    Slice {
        /// Local file
        file: PathBuf,

        /// Remote path
        remote: String,
    },

    /// Print the MD5 digest of a file
    Hash {
        /// Local file
        file: PathBuf,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., account.bucket, upload.block_size)
        key: String,
        /// Value to set
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration from ~/.upform/config.toml
    let cfg = config::load_config();

    match cli.command {
        Commands::Put {
            ref file,
            ref remote,
            md5,
            ref content_type,
        } => {
            let target = resolve_target(&cli, &cfg)?;
            let options = upload::PutConfig {
                file: file.clone(),
                remote: remote.clone(),
                content_md5: md5,
                content_type: content_type.clone(),
            };
            upload::put(&target, options).await?;
        }

        Commands::Slice {
            ref file,
            ref remote,
        } => {
            let target = resolve_target(&cli, &cfg)?;
            upload::slice(&target, file, remote).await?;
        }

        Commands::Hash { ref file } => {
            hash::run(file)?;
        }

        Commands::Config { command } => {
            handle_config_command(command)?;
        }
    }

    Ok(())
}

/// Bucket, key and upload settings after applying flags over the file
fn resolve_target(cli: &Cli, cfg: &config::UpformConfig) -> Result<upload::Target> {
    let bucket = cli
        .bucket
        .clone()
        .or_else(|| cfg.account.bucket.clone())
        .context("No bucket given. Pass --bucket, set UPFORM_BUCKET or run 'upform config set account.bucket <name>'")?;
    let key = cli
        .key
        .clone()
        .or_else(|| cfg.account.key.clone())
        .context("No form API secret given. Set UPFORM_KEY or run 'upform config set account.key <secret>'")?;

    Ok(upload::Target {
        bucket,
        key,
        config: apply_overrides(cli, cfg.upload.clone()),
    })
}

fn apply_overrides(cli: &Cli, mut upload: ClientConfig) -> ClientConfig {
    if let Some(route) = cli.route {
        upload.form_route = route;
        upload.slice_route = route;
    }
    if let Some(endpoint) = &cli.endpoint {
        upload.endpoint = Some(endpoint.clone());
    }
    if let Some(block_size) = cli.block_size {
        upload.block_size = block_size;
    }
    if let Some(concurrency) = cli.concurrency {
        upload.concurrency = concurrency;
    }
    upload
}

/// Handle config subcommands
fn handle_config_command(command: Option<ConfigCommands>) -> Result<()> {
    use console::style;

    match command {
        None | Some(ConfigCommands::Show) => {
            let cfg = config::load_config();
            let upload = &cfg.upload;
            println!();
            println!("{}", style("upform Configuration").bold().underlined());
            println!();
            println!("{}", style("[account]").cyan());
            match &cfg.account.bucket {
                Some(bucket) => println!("  bucket = \"{}\"", bucket),
                None => println!("  bucket = {}", style("(unset)").dim()),
            }
            let key_state = if cfg.account.key.is_some() {
                "(set)"
            } else {
                "(unset)"
            };
            println!("  key = {}", style(key_state).dim());
            println!();
            println!("{}", style("[upload]").cyan());
            println!("  block_size = {}", upload.block_size);
            println!("  expiration_secs = {}", upload.expiration_secs);
            println!("  timeout_secs = {}", upload.timeout_secs);
            println!("  concurrency = {}", upload.concurrency);
            println!("  form_route = \"{}\"", upload.form_route);
            println!("  slice_route = \"{}\"", upload.slice_route);
            println!("  scheme = \"{}\"", upload.scheme);
            if let Some(endpoint) = &upload.endpoint {
                println!("  endpoint = \"{}\"", endpoint);
            }
            println!("  wire = \"{}\"", wire_name(upload.wire));
            println!();

            if let Ok(path) = config::config_file_path() {
                println!("{} {}", style("Config file:").dim(), path.display());
                if !path.exists() {
                    println!(
                        "{} Run '{}' to create it",
                        style("(not created yet)").yellow(),
                        style("upform config init").green()
                    );
                }
            }
        }

        Some(ConfigCommands::Path) => {
            if let Ok(path) = config::config_file_path() {
                println!("{}", path.display());
            }
        }

        Some(ConfigCommands::Init { force }) => {
            let path = config::config_file_path()?;
            if path.exists() && !force {
                println!(
                    "{} Config file already exists at {}",
                    style(symbols::WARN).yellow(),
                    path.display()
                );
                println!("Use --force to overwrite");
                return Ok(());
            }

            config::save_config(&config::UpformConfig::default())?;
            println!(
                "{} Config file created at {}",
                style(symbols::CHECK).green(),
                path.display()
            );
        }

        Some(ConfigCommands::Set { key, value }) => {
            let mut cfg = config::load_config();
            cfg.set(&key, &value)?;
            config::save_config(&cfg)?;
            println!("{} Configuration updated", style(symbols::CHECK).green());
        }
    }

    Ok(())
}

fn wire_name(wire: upform_client::WireFormat) -> &'static str {
    match wire {
        upform_client::WireFormat::PolicyBlob => "policy",
        upform_client::WireFormat::Fields => "fields",
    }
}
