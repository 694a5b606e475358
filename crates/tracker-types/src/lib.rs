//! Common types module for the commission tracker.
//!
//! This module defines the core data types shared by every tracker component:
//! commission orders and their lifecycle status, the product catalog, events,
//! HTTP request/response shapes and small helpers. Keeping them in one place
//! ensures the stores, the engine and the HTTP layer agree on the document
//! shapes persisted in the backend.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Product catalog types: categories, variants and priced add-ons.
pub mod catalog;
/// Event types published on the engine's event bus.
pub mod events;
/// Commission order types including lifecycle status and patches.
pub mod order;
/// Registry trait for self-registering backend implementations.
pub mod registry;
/// Secret string wrapper for passwords and API keys.
pub mod secret_string;
/// Collection names used by the document storage.
pub mod storage;
/// Date and identifier helpers.
pub mod utils;

// Re-export all types for convenient access
pub use api::*;
pub use catalog::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{current_timestamp, current_timestamp_millis, today, truncate_id};
