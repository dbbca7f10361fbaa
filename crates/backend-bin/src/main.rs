use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slax_backend_lib::{auth::CLEANUP_INTERVAL, config::Settings, router, Framework};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Slax application server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (toml, yaml or json); defaults to slax.* in the working directory
    #[arg(short, long, env = "SLAX_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Override the log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Settings::load().context("loading config")?,
    };
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }
    settings.validate()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = settings.bind_addr;
    let state = Framework::new(settings)
        .boot()
        .context("booting authentication")?;
    let cleanup = state.coordinator.spawn_cleanup(CLEANUP_INTERVAL);
    let app = router::create_router(Arc::new(state));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    cleanup.abort();
    Ok(())
}
