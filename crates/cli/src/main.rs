//! Command-line front end for the coffer upload path.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coffer_core::config::AppConfig;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Store files in a coffer byte store and document store.
#[derive(Parser, Debug)]
#[command(name = "coffer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "COFFER_CONFIG",
        default_value = "config/coffer.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file
    Upload {
        /// File to upload
        file: PathBuf,

        /// Parent folder identifier
        #[arg(long, default_value = coffer_core::ROOT_FOLDER_ID)]
        folder: String,

        /// Name to store the file under (default: the file's own name)
        #[arg(long)]
        name: Option<String>,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Mark the file as executable
        #[arg(long)]
        executable: bool,

        /// Expected digest in hex (default: computed from the file)
        #[arg(long)]
        checksum: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Print a stored file record
    Stat {
        /// Record identifier
        id: String,
    },
    /// Check that both stores are reachable
    Check,
}

fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::debug!(config_path = %config_path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path.display());
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("COFFER_").ignore(&["config"]).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(Path::new(&cli.config))?;

    let storage = coffer_storage::from_config(&config.storage)
        .await
        .context("failed to initialize byte store")?;
    let metadata = coffer_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize document store")?;

    match cli.command {
        Command::Upload {
            file,
            folder,
            name,
            tags,
            executable,
            checksum,
            timeout_secs,
        } => {
            let args = commands::UploadArgs {
                file,
                folder,
                name,
                tags,
                executable,
                checksum,
                timeout_secs,
            };
            commands::upload(storage, metadata, config.upload, args).await
        }
        Command::Stat { id } => commands::stat(metadata.as_ref(), &id).await,
        Command::Check => commands::check(storage.as_ref(), metadata.as_ref()).await,
    }
}
