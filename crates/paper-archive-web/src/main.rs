//! Paper Archive Web - credential-isolating gateway over the archive.
//!
//! Browsers talk to this process; this process talks to GitHub, the OCR
//! provider and the translator with server-side credentials. No endpoint
//! accepts or returns a token.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use paper_archive_core::{AppConfig, PaperArchive};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "paper-archive-web")]
#[command(author, version, about = "Paper Archive Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path (defaults to the standard lookup locations)
    #[arg(long, env = "PAPER_ARCHIVE_CONFIG")]
    config: Option<String>,

    /// GitHub repository owner for the archive store
    #[arg(long, env = "ARCHIVE_REPO_OWNER")]
    repo_owner: Option<String>,

    /// GitHub repository name for the archive store
    #[arg(long, env = "ARCHIVE_REPO_NAME")]
    repo_name: Option<String>,

    /// GitHub personal access token (server-side only)
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,

    /// Mistral API key for OCR extraction
    #[arg(long, env = "MISTRAL_API_KEY")]
    mistral_api_key: Option<String>,

    /// DeepSeek API key for translation
    #[arg(long, env = "DEEPSEEK_API_KEY")]
    deepseek_api_key: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Clear the artifact cache on startup
    #[arg(long)]
    clear_cache: bool,
}

impl Args {
    /// Layer CLI/env overrides onto the file-based config.
    fn build_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {path}"))?,
            None => AppConfig::load(),
        };

        if let Some(repo_owner) = &self.repo_owner {
            config.store.repo_owner.clone_from(repo_owner);
        }
        if let Some(repo_name) = &self.repo_name {
            config.store.repo_name.clone_from(repo_name);
        }
        if self.github_token.is_some() {
            config.store.token.clone_from(&self.github_token);
        }
        if self.mistral_api_key.is_some() {
            config.ocr.api_key.clone_from(&self.mistral_api_key);
        }
        if self.deepseek_api_key.is_some() {
            config.translator.api_key.clone_from(&self.deepseek_api_key);
        }

        config.validate().context(
            "Archive repository not configured: set --repo-owner/--repo-name \
             or [store] in the config file",
        )?;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Clear cache if requested
    if args.clear_cache {
        match paper_archive_core::clear_artifact_cache() {
            Ok(count) => info!("Cleared {} cached artifacts", count),
            Err(e) => tracing::warn!("Failed to clear cache: {}", e),
        }
    }

    let config = args.build_config()?;

    // Create application state (opens cache - fails fast if locked)
    let archive = PaperArchive::new(config).context("Failed to initialize archive")?;
    let state = Arc::new(AppState::new(archive));

    // Spawn background task for session cleanup (runs every 5 minutes)
    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        let cleanup_interval = Duration::from_secs(5 * 60);
        loop {
            tokio::time::sleep(cleanup_interval).await;
            cleanup_state.cleanup_old_sessions().await;
            info!("Completed session cleanup");
        }
    });

    // Build router
    let app = Router::new()
        // Listing
        .route("/api/history/{owner}", get(routes::get_history))
        // Upload and deletion
        .route("/api/documents/{owner}", post(routes::upload_document))
        .route(
            "/api/documents/{owner}/{title}/{created_at}",
            delete(routes::delete_document),
        )
        // Artifact content (key is the path)
        .route("/api/artifact/{owner}/{file}", get(routes::get_artifact))
        // Reading sessions and scroll sync
        .route(
            "/api/reading/{owner}/{title}/{created_at}",
            post(routes::open_reading),
        )
        .route("/api/reading/{session_id}/sync", get(routes::sync_position))
        .route(
            "/api/reading/{session_id}/offset",
            get(routes::offset_for_page),
        )
        .route("/api/reading/{session_id}", delete(routes::close_reading))
        // Middleware
        // API responses reflect live store state; never serve them stale
        // (artifact responses set their own revalidation headers)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new()) // Gzip compression for responses
        .layer(DefaultBodyLimit::max(300 * 1024 * 1024)) // 300MB limit for uploads
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
