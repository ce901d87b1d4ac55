//! # Keystone Repository
//!
//! Data access over an untyped document store:
//!
//! ```text
//! Repository
//!   ↓  Arc<dyn DocumentStore>     (read-through boundary)
//! ReadThroughStore               (cache on FindOne/FindAll, writes bypass)
//!   ↓  Arc<dyn DocumentDriver>
//! MySqlDocumentDriver | MemoryDocumentDriver
//! ```

pub mod criteria;
pub mod driver;
pub mod memory;
pub mod mysql;
pub mod pool;
pub mod store;

pub use criteria::{Criteria, Direction, Document, Filter, ID_FIELD};
pub use driver::DocumentDriver;
pub use memory::MemoryDocumentDriver;
pub use mysql::MySqlDocumentDriver;
pub use pool::DatabasePool;
pub use store::{read_key, DocumentStore, ReadThroughStore, ReadThroughStoreParameters};

use keystone_config::{PersistenceConfig, StoreKind};
use keystone_core::KeystoneResult;
use std::sync::Arc;

/// Builds the driver named by `config.kind`.
///
/// The MySQL driver connects and installs its schema before returning.
pub async fn connect_driver(config: &PersistenceConfig) -> KeystoneResult<Arc<dyn DocumentDriver>> {
    match config.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryDocumentDriver::new())),
        StoreKind::Document => {
            let pool = DatabasePool::connect(config).await?;
            pool.run_migrations().await?;
            Ok(Arc::new(MySqlDocumentDriver::new(Arc::new(pool))))
        }
    }
}
