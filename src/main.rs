//! contract_hub server
//!
//! Serves the contract API over HTTP.
//! - Storage: Sled JSON documents (users, templates, contracts, clauses)
//! - Auth: bcrypt password hashes, HS256 bearer tokens
//! - Docs: Swagger UI at /swagger-ui
//!
//! Usage:
//!   cargo run --bin seed_clauses   # populate the clause library
//!   cargo run --bin contract_hub   # start server (PORT, JWT_SECRET, ... or .env)

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use contract_hub::auth::TokenKeys;
use contract_hub::config::Config;
use contract_hub::logging::init_logging;
use contract_hub::rest::{create_router, AppState};
use contract_hub::storage::Storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let _log_guard = init_logging(&config);

    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set; signing tokens with the development secret");
    }

    let addr = config.bind_addr()?;
    let storage = Storage::open(&config.data_dir)?;
    info!(data_dir = %config.data_dir, "storage opened");

    let state = AppState::new(
        storage.clone(),
        TokenKeys::new(config.jwt_secret.as_bytes()),
        config.bcrypt_cost,
    );
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "contract_hub listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down, flushing storage");
    storage.flush().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
