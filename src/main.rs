use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omnix_storage::cli::commands;
use omnix_storage::config::{self, Config};
use omnix_storage::s3::StorageClient;

#[derive(Parser)]
#[command(name = "omnix")]
#[command(version, about = "Client for S3-compatible OmnixStorage servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (environment variables are used when omitted)
    #[arg(long, global = true, env = "OMNIX_CONFIG")]
    config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true, env = "OMNIX_PROFILE")]
    profile: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Disable TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List objects
    Ls {
        /// S3 path (s3://bucket/prefix/)
        path: String,

        /// List recursively
        #[arg(short, long)]
        recursive: bool,

        /// Maximum number of results to show (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_keys: usize,
    },

    /// Show object info
    Stat {
        /// S3 path
        path: String,
    },

    /// Download an object
    Get {
        /// S3 path (s3://bucket/key)
        path: String,

        /// Local destination file
        destination: PathBuf,
    },

    /// Upload a file
    Put {
        /// Local source file
        source: PathBuf,

        /// S3 path (s3://bucket/key)
        path: String,

        /// Content type sent with the object
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Remove objects
    Rm {
        /// S3 path to remove
        path: String,

        /// Remove every object under the prefix
        #[arg(short, long)]
        recursive: bool,
    },

    /// Make bucket
    Mb {
        /// Bucket name (s3://bucket/)
        bucket: String,
    },

    /// Remove bucket
    Rb {
        /// Bucket name (s3://bucket/)
        bucket: String,
    },

    /// Print a presigned URL
    Presign {
        /// HTTP method: get or put
        method: String,

        /// S3 path (s3://bucket/key)
        path: String,

        /// Lifetime in seconds (1 to 604800)
        #[arg(long, default_value = "3600")]
        expires: u64,

        /// Sign for browsers outside the private network
        #[arg(long)]
        browser: bool,
    },

    /// Check server health
    Health,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn build_client(cli: &Cli, config: &Config) -> Result<StorageClient> {
    let mut profile = config
        .get_profile(cli.profile.as_deref())
        .cloned()
        .context("No usable profile in configuration")?;
    if cli.insecure {
        profile.insecure_tls = true;
    }
    profile.validate()?;

    StorageClient::for_profile(&profile, config).context("Failed to create storage client")
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;
    let client = build_client(&cli, &config)?;

    match cli.command {
        Commands::Ls {
            path,
            recursive,
            max_keys,
        } => {
            commands::cmd_ls(&client, &path, recursive, max_keys).await?;
        }
        Commands::Stat { path } => {
            commands::cmd_stat(&client, &path).await?;
        }
        Commands::Get { path, destination } => {
            commands::cmd_get(&client, &path, &destination).await?;
        }
        Commands::Put {
            source,
            path,
            content_type,
        } => {
            commands::cmd_put(&client, &source, &path, content_type.as_deref()).await?;
        }
        Commands::Rm { path, recursive } => {
            commands::cmd_rm(&client, &path, recursive).await?;
        }
        Commands::Mb { bucket } => {
            commands::cmd_mb(&client, &bucket).await?;
        }
        Commands::Rb { bucket } => {
            commands::cmd_rb(&client, &bucket).await?;
        }
        Commands::Presign {
            method,
            path,
            expires,
            browser,
        } => {
            commands::cmd_presign(&client, &method, &path, expires, browser)?;
        }
        Commands::Health => {
            commands::cmd_health(&client).await?;
        }
    }

    Ok(())
}
