//! Live-synchronized stores for orders and the catalog.

pub mod catalog;
pub mod orders;
mod sync;

pub use catalog::{CatalogStore, CatalogStoreError};
pub use orders::{OrderStore, OrderStoreError, SyncStatus};
