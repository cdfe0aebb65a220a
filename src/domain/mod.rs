//! Domain types for image assets.

pub mod identity;

pub use identity::AssetIdentity;
