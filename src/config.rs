use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::env;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORAGE_DIR: &str = "./data/objects";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/meta/bucket_browser.db";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Command-line entry point. Every flag falls back to a `BUCKET_BROWSER_*`
/// environment variable, then to a built-in default.
#[derive(Parser, Debug)]
#[command(author, version, about = "Browse object-storage buckets as folders")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the listing API (default)
    Serve,
    /// Create the metadata schema and exit
    Migrate,
    /// Interactive terminal browser
    Browse(BrowseArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServerArgs {
    /// Host to bind to (overrides BUCKET_BROWSER_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to bind to (overrides BUCKET_BROWSER_PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Directory holding object payloads (overrides BUCKET_BROWSER_STORAGE_DIR)
    #[arg(long, global = true)]
    pub storage_dir: Option<String>,

    /// Metadata database URL (overrides BUCKET_BROWSER_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Origin allowed to call the API from a browser (overrides BUCKET_BROWSER_CORS_ORIGIN)
    #[arg(long, global = true)]
    pub cors_origin: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct BrowseArgs {
    /// Base URL of the listing API (overrides BUCKET_BROWSER_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Read listings straight from the local metadata database instead of the API
    #[arg(long)]
    pub local: bool,

    /// Bucket to open on start
    pub bucket: Option<String>,
}

/// Settings for the listing server and for local database access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub cors_origin: String,
}

/// Where the terminal browser gets its listings from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    Api(String),
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseConfig {
    pub source: ListingSource,
    pub initial_bucket: Option<String>,
}

impl AppConfig {
    /// Merge CLI flags over environment variables over defaults.
    pub fn resolve(args: &ServerArgs) -> Result<Self> {
        let env_port = match env::var("BUCKET_BROWSER_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing BUCKET_BROWSER_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_PORT,
            Err(err) => return Err(err).context("reading BUCKET_BROWSER_PORT"),
        };

        Ok(Self {
            host: pick(&args.host, "BUCKET_BROWSER_HOST", DEFAULT_HOST),
            port: args.port.unwrap_or(env_port),
            storage_dir: pick(&args.storage_dir, "BUCKET_BROWSER_STORAGE_DIR", DEFAULT_STORAGE_DIR),
            database_url: pick(
                &args.database_url,
                "BUCKET_BROWSER_DATABASE_URL",
                DEFAULT_DATABASE_URL,
            ),
            cors_origin: pick(&args.cors_origin, "BUCKET_BROWSER_CORS_ORIGIN", DEFAULT_CORS_ORIGIN),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl BrowseConfig {
    pub fn resolve(args: &BrowseArgs) -> Self {
        let source = if args.local {
            ListingSource::Local
        } else {
            ListingSource::Api(pick(&args.api_url, "BUCKET_BROWSER_API_URL", DEFAULT_API_URL))
        };
        Self {
            source,
            initial_bucket: args.bucket.clone(),
        }
    }
}

fn pick(flag: &Option<String>, var: &str, default: &str) -> String {
    flag.clone()
        .or_else(|| env::var(var).ok())
        .unwrap_or_else(|| default.to_string())
}
