mod config;

use biblebuddy_agent::TurnCoordinator;
use biblebuddy_gateway::{spawn_idle_reaper, AppState, GatewayServer, RateLimiter, Sanitizer};
use biblebuddy_session::{InMemorySessionStore, SessionStore};
use clap::{Parser, Subcommand};
use config::BuddyConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Env var consulted when the config file carries no API key.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Env var holding the log filter.
const LOG_ENV: &str = "RUST_LOG";

#[derive(Parser)]
#[command(name = "biblebuddy", about = "BibleBuddy, a Bible study chat assistant")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "biblebuddy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration (credential redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may set the log filter, so it is read before the subscriber starts.
    load_dotenv(None);
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(LOG_ENV))
        .json()
        .init();

    let cli = Cli::parse();

    let (mut config, found) = BuddyConfig::load(&cli.config).await?;
    if !found {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    config.assistant = config
        .assistant
        .with_fallback_credential(std::env::var(API_KEY_ENV).ok());

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await?,
        Commands::Config => println!("{config:#?}"),
    }

    Ok(())
}

/// Loads `path`, or the nearest `.env` when `None`. A missing file is fine.
fn load_dotenv(path: Option<&Path>) {
    let _ = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(drop),
    };
}

fn log_filter(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new("info"))
}

async fn serve(config: BuddyConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);

    let coordinator = Arc::new(TurnCoordinator::from_config(&config.assistant)?);
    info!(
        model = %config.assistant.model_id,
        credential_configured = coordinator.has_credential(),
        "Assistant configured"
    );

    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let rate_limiter = Arc::new(RateLimiter::new(
        config.security.max_burst,
        config.security.max_requests_per_second,
    ));
    let reaper = spawn_idle_reaper(
        sessions.clone(),
        rate_limiter.clone(),
        config.security.session_idle(),
    );

    let state = AppState::new(coordinator, sessions)
        .with_rate_limiter(rate_limiter)
        .with_sanitizer(Sanitizer::new(config.security.max_message_length));
    let app = GatewayServer::build(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("BibleBuddy listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    info!("BibleBuddy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
