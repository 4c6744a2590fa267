use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::dispatch::Limits;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Dataset file to serve
    #[arg(long, env = "DATA_PATH", default_value = "./data/trendwatch.twds")]
    data_path: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
    /// Bearer token required on tool calls
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
    /// Token for /admin endpoints
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
    /// Per-call deadline for search and fetch
    #[arg(long, default_value_t = 2_000)]
    request_timeout_ms: u64,
    #[arg(long, default_value_t = 20)]
    default_limit: usize,
    #[arg(long, default_value_t = 100)]
    max_limit: usize,
    /// Comma-separated allowed origins
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    cors_allow_origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        data_path: args.data_path,
        api_token: args.api_token.filter(|t| !t.is_empty()),
        admin_token: args.admin_token.filter(|t| !t.is_empty()),
        request_timeout: Duration::from_millis(args.request_timeout_ms),
        limits: Limits { default_limit: args.default_limit, max_limit: args.max_limit },
        cors_allow_origin: args.cors_allow_origin,
    };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
