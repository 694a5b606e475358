//! Core of the commission tracker.
//!
//! Ties the pieces together: the lifecycle state machine, price and
//! description composition, the live order and catalog stores, admin
//! sessions and view filtering. [`TrackerBuilder`] assembles a
//! [`TrackerEngine`] from configuration and backend factories; the engine
//! exposes the operations the HTTP layer calls.

pub mod builder;
pub mod composer;
pub mod engine;
pub mod handlers;
pub mod samples;
pub mod session;
pub mod state;
pub mod stores;
pub mod view;

pub use builder::{BuilderError, TrackerBuilder, TrackerFactories};
pub use engine::{event_bus::EventBus, TrackerEngine, TrackerError};
pub use session::{AdminAuth, AdminSession, AuthError};
pub use stores::{CatalogStore, CatalogStoreError, OrderStore, OrderStoreError, SyncStatus};
