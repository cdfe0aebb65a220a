//! imgfetch - Fetch-once image cache with callback delivery
//!
//! Given a remote image URL, the engine downloads the image at most once per
//! cache key, stores it under a deterministic file name, decodes it and
//! notifies every caller that asked for it.
//!
//! # Architecture
//!
//! - `AssetIdentity` names a request: URL plus optional file-name prefix
//! - `AssetStore` maps file names into one cache directory
//! - `FetchEngine` checks the cache, coalesces concurrent requests for the
//!   same key and fans the outcome out to every registered sink
//!
//! # Modules
//!
//! - `adapters`: External collaborators (HTTP transport, image decoder)
//! - `core`: Fetch engine, notification sinks, errors
//! - `domain`: Asset identity
//! - `store`: On-disk cache directory
//! - `sync_runner`: Blocking adapter for awaiting callbacks in tests
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch an image (prints the cached path)
//! imgfetch fetch https://example.com/img/photo.png --prefix THUMB
//!
//! # Drop everything cached
//! imgfetch purge
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;
pub mod sync_runner;

// Re-export main types at crate root for convenience
pub use adapters::{Decoder, HttpTransport, ImageDecoder, Transport};
pub use crate::core::{
    CallbackSink, DecodeError, FetchEngine, FetchError, NetworkError, NotificationSink,
    SharedSink, StorageError,
};
pub use domain::AssetIdentity;
pub use store::AssetStore;
pub use sync_runner::{Outcome, SyncRunner};
