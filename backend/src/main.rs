//! Backend entry-point: loads settings, migrates the schema and serves the
//! account API.

mod server;

use std::io;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use accounts_backend::inbound::http::health::HealthState;
use accounts_backend::inbound::http::session_config::load_session_key;
use accounts_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use accounts_backend::settings::ServerSettings;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load()
        .map_err(|e| io::Error::other(format!("failed to load settings: {e}")))?;
    let allow_ephemeral = cfg!(debug_assertions) || settings.allow_ephemeral_session_key;
    let key = load_session_key(settings.session_key_file(), allow_ephemeral)
        .map_err(io::Error::other)?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| io::Error::other(format!("invalid bind address: {e}")))?;

    let applied = run_pending_migrations(settings.database_url())
        .await
        .map_err(io::Error::other)?;
    info!(applied, "schema migrations applied");

    let pool = DbPool::new(
        PoolConfig::new(settings.database_url()).with_max_size(settings.pool_max_size()),
    )
    .await
    .map_err(io::Error::other)?;

    let health_state = web::Data::new(HealthState::new());
    let config =
        ServerConfig::new(key, bind_addr, pool).with_cookie_secure(settings.cookie_secure);
    let server = create_server(health_state, config)?;
    info!(%bind_addr, "accounts backend listening");
    server.await
}
