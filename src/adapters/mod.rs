//! Adapter interfaces for the engine's external collaborators.
//!
//! - [`Transport`]: downloads raw bytes for a URL
//! - [`Decoder`]: turns raw bytes into an in-memory image

pub mod decoder;
pub mod http;

use async_trait::async_trait;

use crate::core::error::NetworkError;

pub use decoder::{Decoder, ImageDecoder};
pub use http::HttpTransport;

/// Trait for network transports
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Fetch the body at `url`.
    ///
    /// Timeouts, redirects and TLS are the transport's concern; any failure
    /// is reported as a [`NetworkError`].
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
}
