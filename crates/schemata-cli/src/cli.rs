//! schemata CLI - extract a database catalog into the unified table model

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use schemata_core::SchemataConfig;
use schemata_drivers::DriverRegistry;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "schemata=info";

#[derive(Parser)]
#[command(name = "schemata")]
#[command(about = "Extract tables, columns and keys from a relational catalog")]
#[command(version)]
struct Cli {
    /// Log format written to stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every table of the configured database
    Extract {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Only extract these schemas (repeatable, overrides the config file)
        #[arg(long = "schema")]
        schemas: Vec<String>,

        /// Add the synthetic PostgreSQL xmin concurrency column
        #[arg(long)]
        concurrency_column: bool,

        /// Password, kept out of the config file
        #[arg(long, env = "SCHEMATA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List the available catalog drivers
    Drivers,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_format);

    let registry = DriverRegistry::with_defaults();

    match cli.command {
        Commands::Drivers => {
            println!("{}", render::drivers_table(&registry.list()));
        }
        Commands::Extract {
            config,
            output,
            format,
            schemas,
            concurrency_column,
            password,
        } => {
            let path = match config {
                Some(path) => path,
                None => SchemataConfig::default_path()
                    .context("no configuration directory on this platform; pass --config")?,
            };
            let mut config = SchemataConfig::from_path(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;

            if !schemas.is_empty() {
                config.extract.schemas = schemas;
            }
            if concurrency_column {
                config.extract.concurrency_column = true;
            }
            if password.is_some() {
                config.connection.password = password;
            }

            let token = cancel_on_ctrl_c();
            let tables = registry
                .extract_cancellable(&config.connection, &config.extract, token)
                .await
                .with_context(|| format!("extraction with driver '{}' failed", config.connection.driver))?;

            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&tables)?,
                OutputFormat::Summary => render::summary_table(&tables).to_string(),
            };

            match output {
                Some(file) => {
                    std::fs::write(&file, rendered + "\n")
                        .with_context(|| format!("failed to write {}", file.display()))?;
                    tracing::info!(path = %file.display(), tables = tables.len(), "catalog written");
                }
                None => println!("{}", rendered),
            }
        }
    }

    Ok(())
}

/// Log to stderr so stdout carries only the extracted model.
fn setup_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping extraction");
            cancel.cancel();
        }
    });
    token
}
