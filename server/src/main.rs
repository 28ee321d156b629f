use anyhow::{bail, Result};
use clap::Parser;
use engine::engine::EngineConfig;
use engine::score::ScoreMode;
use server::build_app;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "server", about = "Product search HTTP server")]
struct Args {
    /// Path to the index store directory
    #[arg(long, default_value = "./data")]
    store: String,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Catalog snapshot cache TTL in seconds
    #[arg(long, default_value_t = 86_400)]
    cache_ttl_secs: u64,

    /// Per-request retrieval deadline in milliseconds
    #[arg(long, default_value_t = 2_000)]
    timeout_ms: u64,

    /// Default scoring mode: lexical or heuristic
    #[arg(long, default_value = "lexical")]
    mode: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let score_mode = match args.mode.as_str() {
        "lexical" => ScoreMode::Lexical,
        "heuristic" => ScoreMode::Heuristic,
        other => bail!("unknown scoring mode {other:?}, expected lexical or heuristic"),
    };
    let config = EngineConfig {
        cache_ttl: Duration::from_secs(args.cache_ttl_secs),
        request_timeout: Duration::from_millis(args.timeout_ms),
        score_mode,
    };

    let app = build_app(&args.store, config)?;
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, store = %args.store, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
