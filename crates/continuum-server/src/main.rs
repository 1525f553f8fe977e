//! Continuum server binary: runs the `/v1` HTTP transport over a
//! `continuum-core` engine (spec §6).

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use continuum_core::{AsyncMemoryEngine, Config, MemoryEngine};
use continuum_server::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "continuum-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP server for the Continuum memory engine")]
struct Args {
    /// Port to bind.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Override the SQLite database path.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?)).with_writer(io::stderr).init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(db_path) = args.db_path {
        config.db_path = Some(db_path);
    }

    let engine = MemoryEngine::open(config)?;
    let state = AppState::new(AsyncMemoryEngine::new(engine));
    let app = continuum_server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("continuum-server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
