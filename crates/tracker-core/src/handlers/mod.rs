//! Request handlers that turn client and admin submissions into orders.

pub mod order;

pub use order::{OrderHandler, SubmissionError};
