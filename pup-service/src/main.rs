//! pupcycler
//!
//! Serves the device state API:
//! - token-authenticated compare-and-swap state transitions
//! - liveness, meta and metrics probes

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pup_core::{AuthTokens, Authenticator};
use pup_http::{AppState, HttpServer, MiddlewareConfig};
use pup_store::Transitioner;

#[derive(Parser, Debug)]
#[command(name = "pupcycler")]
#[command(about = "Device lifecycle state service", version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short = 'D', long, global = true, env = "PUPCYCLER_DEBUG")]
    debug: bool,

    /// Device store URL (redis://, sqlite:, memory://)
    #[arg(
        short = 'R',
        long,
        global = true,
        env = "PUPCYCLER_STORE_URL",
        default_value = "redis://localhost:6379/0"
    )]
    store_url: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "PUPCYCLER_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Port number or host:port at which to listen
        #[arg(short, long, env = "PUPCYCLER_PORT", default_value = "9983")]
        port: String,

        /// Comma-separated auth tokens accepted as `Authorization: token <tok>`
        #[arg(
            short = 'T',
            long,
            env = "PUPCYCLER_AUTH_TOKENS",
            value_delimiter = ',',
            hide_env_values = true
        )]
        auth_tokens: Vec<String>,

        /// Deadline for each store call, in milliseconds
        #[arg(long, env = "PUPCYCLER_STORAGE_TIMEOUT_MS", default_value_t = 5000)]
        storage_timeout_ms: u64,

        /// Deadline for a whole request, in seconds
        #[arg(long, env = "PUPCYCLER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
        request_timeout_secs: u64,

        /// Answer state-machine rejections with 409 instead of 500
        #[arg(long, env = "PUPCYCLER_CONFLICT_STATUS")]
        conflict_status: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from /etc/pupcycler/environment (if exists)
    let env = pup_core::config::load_environment();

    let args = Args::parse();
    init_tracing(args.debug, args.log_json);
    env.log();

    match args.command {
        Commands::Serve {
            port,
            auth_tokens,
            storage_timeout_ms,
            request_timeout_secs,
            conflict_status,
        } => {
            let tokens = AuthTokens::new(auth_tokens);
            info!("Loaded {} auth tokens", tokens.len());

            let store = pup_store::open_store(&args.store_url).await?;
            let transitioner = Transitioner::new(store)
                .with_deadline(Duration::from_millis(storage_timeout_ms));

            let state = AppState::new(transitioner, Authenticator::new(tokens))
                .with_conflict_status(conflict_status);

            let server = HttpServer::builder()
                .bind(port)
                .state(Arc::new(state))
                .middleware(
                    MiddlewareConfig::new().timeout(Duration::from_secs(request_timeout_secs)),
                )
                .build()?;

            info!(addr = server.bind_addr(), "Starting pupcycler");
            server.serve().await?;
        }
    }

    Ok(())
}

fn init_tracing(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
