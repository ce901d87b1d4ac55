//! Server startup utilities.

use crate::di::Backends;
use futures::future::join_all;
use keystone_cache::CacheManager;
use keystone_config::AppConfig;
use keystone_core::{HealthCheck, HealthStatus};
use keystone_events::{register_confirmation_listeners, LogConfirmationNotifier, MessageBus};
use keystone_repository::ReadThroughStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Describes every metric the workspace records.
pub fn register_metrics(config: &AppConfig) {
    if config.observability.metrics_enabled {
        keystone_cache::metrics::register_metrics();
        keystone_events::metrics::register_metrics();
    }
}

/// Registers the application's event listeners.
pub fn register_listeners(bus: &dyn MessageBus) {
    register_confirmation_listeners(bus, Arc::new(LogConfirmationNotifier));
    info!(topics = ?bus.topics(), "Event listeners registered");
}

/// Runs every health check and logs the result.
///
/// Returns the checks that were not healthy.
pub async fn check_health(backends: &Backends) -> Vec<(String, HealthStatus)> {
    let checks: Vec<Box<dyn HealthCheck>> = vec![
        Box::new(CacheManager::new(Arc::clone(&backends.cache))),
        Box::new(ReadThroughStore::new(
            Arc::clone(&backends.cache),
            Arc::clone(&backends.driver),
        )),
    ];

    let statuses = join_all(checks.iter().map(|check| check.check())).await;

    checks
        .iter()
        .zip(statuses)
        .filter_map(|(check, status)| {
            if status.is_healthy() {
                info!(check = check.name(), "Healthy");
                None
            } else {
                warn!(check = check.name(), status = ?status, "Health check failed");
                Some((check.name().to_string(), status))
            }
        })
        .collect()
}

/// Releases backend connections once the server stops.
pub async fn shutdown(backends: &Backends) {
    backends.driver.close().await;
    info!(store = backends.driver.kind().as_str(), "Document store closed");
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Keystone {}", config.app.version);
    info!("Environment:  {}", config.app.environment);
    info!("Cache:        {} ({})", config.cache.kind.as_str(), config.cache.namespace());
    info!("Persistence:  {}", config.persistence.kind.as_str());
    match config.events.publish_timeout() {
        Some(timeout) => info!("Publish timeout: {:?}", timeout),
        None => info!("Publish timeout: none"),
    }
    info!("{}", separator);
}
