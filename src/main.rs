use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue};
use bucket_browser::{
    config::{AppConfig, BrowseConfig, Cli, Command, ListingSource},
    console,
    migrations::run_migrations,
    routes::routes::{cors_layer, routes},
    services::{
        key_lister::{HttpKeyLister, KeyLister},
        storage_service::StorageService,
    },
};
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::{io::BufReader, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup (stderr, so the terminal browser owns stdout) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = AppConfig::resolve(&cli.server)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::Migrate => {
            let db = connect(&cfg).await?;
            run_migrations(&db).await?;
            tracing::info!("Database migration complete.");
            Ok(())
        }
        Command::Browse(args) => browse(cfg, BrowseConfig::resolve(&args)).await,
    }
}

async fn serve(cfg: AppConfig) -> Result<()> {
    tracing::info!("Starting bucket-browser with config: {:?}", cfg);

    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    let db = Arc::new(connect(&cfg).await?);
    let storage = StorageService::new(db, cfg.storage_dir.clone());

    let origin = HeaderValue::from_str(&cfg.cors_origin)
        .with_context(|| format!("invalid CORS origin `{}`", cfg.cors_origin))?;
    let app: Router = routes().with_state(storage).layer(cors_layer(origin));

    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn browse(cfg: AppConfig, browse_cfg: BrowseConfig) -> Result<()> {
    let lister: Arc<dyn KeyLister> = match &browse_cfg.source {
        ListingSource::Api(url) => {
            tracing::debug!("Browsing through API at {}", url);
            Arc::new(HttpKeyLister::new(url)?)
        }
        ListingSource::Local => {
            tracing::debug!("Browsing local database {}", cfg.database_url);
            let db = Arc::new(connect(&cfg).await?);
            Arc::new(StorageService::new(db, cfg.storage_dir.clone()))
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    console::run(lister, browse_cfg.initial_bucket, stdin, std::io::stdout()).await
}

/// Open the metadata database, creating its file and parent directory when
/// they do not exist yet.
async fn connect(cfg: &AppConfig) -> Result<SqlitePool> {
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database url `{}`", db_url))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", db_url))?;
    Ok(pool)
}
