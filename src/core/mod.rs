//! Core fetch logic.
//!
//! This module contains:
//! - FetchEngine: cache lookup, fetch deduplication and fan-out
//! - NotificationSink: the callback capability requests register
//! - Error types delivered to sinks

pub mod engine;
pub mod error;
pub mod sink;

// Re-export commonly used types
pub use engine::{FetchEngine, SharedSink};
pub use error::{DecodeError, FetchError, NetworkError, StorageError};
pub use sink::{CallbackSink, NotificationSink};
