use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::network;
use crate::server::Server;
use crate::service::BillingService;
use crate::store::FileStore;
use crate::{Config, Result};
use anyhow::Context;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

/// Handles `meterbill serve`: opens the store, binds the listener and serves requests until
/// Ctrl-C is pressed.
///
/// # Arguments
/// - `config` - The loaded configuration.
/// - `port` - Overrides the port from `config.json` when given.
///
/// # Errors
/// Returns an error if the store has not been initialized or is unreadable, or if the listener
/// cannot be bound.
pub async fn serve(config: Config, port: Option<u16>) -> Result<Out<()>> {
    run(config, port, shutdown_signal()).await
}

async fn run(
    config: Config,
    port: Option<u16>,
    shutdown: impl Future<Output = ()>,
) -> Result<Out<()>> {
    let store = FileStore::open(config.store_paths().clone()).await?;
    let service = BillingService::new(Arc::new(store), config.per_unit_rate());
    info!("Per-unit rate is {}", service.per_unit_rate());

    let ip: IpAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind_address '{}'", config.bind_address()))
        .pub_result(ErrorType::Config)?;
    let addr = SocketAddr::new(ip, port.unwrap_or(config.port()));
    let server = Server::bind(addr, service, config.static_dir()).await?;
    let port = server.local_addr()?.port();

    info!("Server running on {}:{port}", network::local_ip().await);
    server.run(shutdown).await?;
    Ok("Server stopped".into())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C, the server must be killed to stop it: {e}");
        std::future::pending::<()>().await;
    }
}
