//! Command-line access to the remote compute service.
//!
//! Evaluates serialized expressions, fetches single images and image
//! collections over a bounding box, and downloads feature tables.

mod commands;
mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geofetch_client::{
    ClientConfig, ComputeClient, NoAuth, StaticToken, TokenFile, TokenProvider,
};
use geofetch_common::BoundingBox;
use geofetch_protocol::DataFormat;

#[derive(Parser, Debug)]
#[command(name = "geofetch")]
#[command(about = "Fetch images, time series and tables from a remote compute service")]
struct Cli {
    /// YAML client configuration
    #[arg(long, env = "GEOFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Cloud project (overrides the config file)
    #[arg(long, env = "GEOFETCH_PROJECT")]
    project: Option<String>,

    /// Bearer token (overrides the config's token_file)
    #[arg(long, env = "GEOFETCH_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Send requests without credentials
    #[arg(long)]
    no_auth: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a serialized expression and print the result
    Value {
        /// JSON file holding `{"result": .., "values": {..}}`
        #[arg(short, long)]
        expression: PathBuf,
    },

    /// Fetch one image over a bounding box
    Image {
        /// Image asset id
        #[arg(long)]
        image_id: String,

        #[command(flatten)]
        grid: GridArgs,

        /// Pixel format: NPY or GEO_TIFF
        #[arg(long, default_value = "NPY")]
        format: DataFormat,

        /// File to write; GEO_TIFF output requires it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch every image of a collection as a time series
    Collection {
        /// Image collection asset id
        #[arg(long)]
        collection_id: String,

        #[command(flatten)]
        grid: GridArgs,

        /// Concurrent image requests (overrides the config)
        #[arg(long)]
        max_workers: Option<usize>,

        /// Show a progress bar while images are fetched
        #[arg(short, long)]
        verbose: bool,
    },

    /// Fetch a feature table
    Table {
        /// Table asset id
        #[arg(long)]
        table_id: String,

        /// Also report the masked domain the features cover at this resolution
        #[arg(long)]
        resolution: Option<f64>,

        /// GeoJSON file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output grid and pixel handling shared by `image` and `collection`.
#[derive(Args, Debug)]
struct GridArgs {
    /// minx,miny,maxx,maxy in the target CRS
    #[arg(long, allow_hyphen_values = true)]
    bbox: BoundingBox,

    /// Pixel size in CRS units
    #[arg(long, default_value = "0.01")]
    resolution: f64,

    #[arg(long, default_value = "EPSG:4326")]
    crs: String,

    /// Comma-separated band names (default: all)
    #[arg(long, value_delimiter = ',')]
    bands: Vec<String>,

    /// Value treated as missing
    #[arg(long, allow_hyphen_values = true)]
    no_data: Option<f64>,

    /// Keep pixels outside the domain mask
    #[arg(long)]
    no_mask: bool,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ClientConfig::from_env().context("Invalid GEOFETCH_* environment")?,
    };
    if let Some(project) = &cli.project {
        config.project = project.clone();
    }
    if let Command::Collection {
        max_workers: Some(workers),
        ..
    } = &cli.command
    {
        config.max_workers = *workers;
    }
    Ok(config)
}

fn token_provider(cli: &Cli, config: &ClientConfig) -> Result<Arc<dyn TokenProvider>> {
    if cli.no_auth {
        return Ok(Arc::new(NoAuth));
    }
    if let Some(token) = &cli.token {
        return Ok(Arc::new(StaticToken::new(token.clone())));
    }
    if let Some(path) = &config.token_file {
        return Ok(Arc::new(TokenFile::new(path.clone())));
    }
    bail!("No credentials: pass --token, set GEOFETCH_ACCESS_TOKEN or token_file, or use --no-auth")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs)?;

    let config = load_config(&cli)?;
    let tokens = token_provider(&cli, &config)?;
    info!(project = %config.project, api = %config.api_base_url, "Starting geofetch");

    let client = ComputeClient::new(config, tokens).context("Failed to create client")?;

    match cli.command {
        Command::Value { expression } => commands::value(&client, &expression).await,
        Command::Image {
            image_id,
            grid,
            format,
            output,
        } => commands::image(&client, &image_id, &grid, format, output.as_deref()).await,
        Command::Collection {
            collection_id,
            grid,
            verbose,
            ..
        } => commands::collection(&client, &collection_id, &grid, verbose).await,
        Command::Table {
            table_id,
            resolution,
            output,
        } => commands::table(&client, &table_id, resolution, output.as_deref()).await,
    }
}
