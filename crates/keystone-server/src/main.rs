//! # Keystone Server
//!
//! Loads configuration, connects the cache and the document store, wires
//! them into the DI module, registers event listeners and runs until
//! Ctrl+C or SIGTERM.

use keystone_config::ConfigLoader;
use keystone_core::telemetry::init_logging;
use keystone_core::{HasComponent, KeystoneResult};
use keystone_events::MessageBus;
use keystone_server::{di, startup};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("keystone: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> KeystoneResult<()> {
    let config = ConfigLoader::from_default_location().load()?;

    init_logging(&config.observability.logging())?;

    info!("Starting Keystone...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    startup::register_metrics(&config);

    let backends = di::connect_backends(&config).await?;
    for (check, status) in startup::check_health(&backends).await {
        warn!(check = %check, status = ?status, "Starting with an unhealthy dependency");
    }

    let module = di::build_module(&backends, config.events.publish_timeout());
    let bus: Arc<dyn MessageBus> = module.resolve();
    startup::register_listeners(bus.as_ref());

    startup::print_startup_info(&config);

    shutdown_signal().await;
    startup::shutdown(&backends).await;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
