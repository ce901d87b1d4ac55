//! Dependency injection module using Shaku.
//!
//! The cache, the read-through store and the event bus are built once at
//! startup and resolved from [`AppModule`] by every consumer.

use keystone_cache::{CacheBackend, CacheManager, CacheManagerParameters};
use keystone_config::AppConfig;
use keystone_core::{module, KeystoneResult};
use keystone_events::{EventBus, EventBusParameters, TopicRegistry};
use keystone_repository::{connect_driver, DocumentDriver, ReadThroughStore, ReadThroughStoreParameters};
use std::sync::Arc;
use std::time::Duration;

module! {
    pub AppModule {
        components = [
            CacheManager,
            ReadThroughStore,
            EventBus,
        ],
        providers = [],
    }
}

/// Connected backends, before they are handed to the module.
pub struct Backends {
    pub cache: Arc<dyn CacheBackend>,
    pub driver: Arc<dyn DocumentDriver>,
}

/// Selects and connects the cache backend and the document driver.
pub async fn connect_backends(config: &AppConfig) -> KeystoneResult<Backends> {
    let cache = CacheManager::connect(&config.cache).await?;
    let driver = connect_driver(&config.persistence).await?;
    Ok(Backends { cache, driver })
}

/// Builds the module around already connected backends.
#[must_use]
pub fn build_module(backends: &Backends, publish_timeout: Option<Duration>) -> Arc<AppModule> {
    let module = AppModule::builder()
        .with_component_parameters::<CacheManager>(CacheManagerParameters {
            backend: Arc::clone(&backends.cache),
        })
        .with_component_parameters::<ReadThroughStore>(ReadThroughStoreParameters {
            driver: Arc::clone(&backends.driver),
        })
        .with_component_parameters::<EventBus>(EventBusParameters {
            registry: TopicRegistry::default(),
            publish_timeout,
        })
        .build();

    Arc::new(module)
}

/// Connects every backend named by `config` and builds the module.
pub async fn build_app_module(config: &AppConfig) -> KeystoneResult<Arc<AppModule>> {
    let backends = connect_backends(config).await?;
    Ok(build_module(&backends, config.events.publish_timeout()))
}
