//! Local storage for fetched image assets.
//!
//! # Storage Layout
//!
//! ```text
//! <cache_dir>/
//! ├── image.png           # AssetIdentity without prefix
//! ├── THUMB_image.png     # same URL, prefix "THUMB"
//! └── .tmpXXXXXX          # in-progress write, renamed into place on success
//! ```
//!
//! The presence of a file is the only record that an asset is cached.

pub mod asset_store;

pub use asset_store::AssetStore;
