//! Server binary: wires the registry, the development authenticator and the
//! HTTP/websocket routes, then serves until interrupted.

use clap::Parser;
use log::info;
use server::auth::TokenAuth;
use server::http::{router, AppState};
use server::registry::{RegistryConfig, RoomRegistry};
use server::results::LogResultSink;
use shared::GameConfig;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative Pong room server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Seconds a finished room stays around before the sweep removes it
    #[arg(long, default_value_t = 300)]
    finished_grace_secs: u64,

    /// Seconds an empty waiting room may sit unjoined before removal
    #[arg(long, default_value_t = 1800)]
    idle_window_secs: u64,

    /// Seconds between sweep passes
    #[arg(long, default_value_t = 60)]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let registry = Arc::new(RoomRegistry::new(
        Arc::new(LogResultSink),
        GameConfig::default(),
        RegistryConfig {
            finished_grace: Duration::from_secs(args.finished_grace_secs),
            idle_window: Duration::from_secs(args.idle_window_secs),
        },
    ));
    let sweeper = registry.spawn_sweeper(Duration::from_secs(args.sweep_interval_secs));

    let app = router(AppState {
        registry,
        auth: Arc::new(TokenAuth),
    });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    sweeper.abort();
    Ok(())
}
