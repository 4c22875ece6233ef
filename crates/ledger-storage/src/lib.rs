//! Transactional storage primitives for the Append Coordinator.

pub mod config;
pub mod error;
pub mod memory;
pub mod port;
pub mod postgres;

pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use memory::{InMemoryStoragePort, InMemoryTx};
pub use port::{AssetTip, IdempotencyRecord, StoragePort};
pub use postgres::{Database, PostgresStoragePort};
