//! Identity of a requested image asset.
//!
//! An [`AssetIdentity`] pairs the remote locator with an optional file-name
//! prefix. The derived [`AssetIdentity::file_name`] is the cache key: it names
//! the file on disk and deduplicates concurrent fetches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between the prefix and the last path component
const PREFIX_SEPARATOR: char = '_';

/// Immutable description of a requested asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetIdentity {
    /// Absolute URL of the remote asset
    remote_url: String,

    /// Optional prefix prepended to the local file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_name_prefix: Option<String>,
}

impl AssetIdentity {
    /// Create an identity for a remote URL without a prefix
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            file_name_prefix: None,
        }
    }

    /// Return a copy of this identity with a file-name prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_name_prefix = Some(prefix.into());
        self
    }

    /// The remote URL this identity points at
    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// The file-name prefix, if any
    pub fn file_name_prefix(&self) -> Option<&str> {
        self.file_name_prefix.as_deref()
    }

    /// Canonical local file name.
    ///
    /// `PREFIX_<last path component>` when a non-empty prefix is set, the bare
    /// last path component otherwise:
    ///
    /// ```
    /// use imgfetch::AssetIdentity;
    ///
    /// let plain = AssetIdentity::new("http://host/path/image.png");
    /// assert_eq!(plain.file_name(), "image.png");
    ///
    /// let thumb = plain.with_prefix("THUMB");
    /// assert_eq!(thumb.file_name(), "THUMB_image.png");
    /// ```
    pub fn file_name(&self) -> String {
        let last = last_path_component(&self.remote_url);

        match self.file_name_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}{}{}", prefix, PREFIX_SEPARATOR, last)
            }
            _ => last.to_string(),
        }
    }
}

impl fmt::Display for AssetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file_name_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => write!(f, "{} ({})", self.remote_url, prefix),
            _ => write!(f, "{}", self.remote_url),
        }
    }
}

/// Last `/`-separated component of a locator.
///
/// Query and fragment are ignored and trailing slashes are skipped, so
/// `http://host/dir/` yields `dir`. Never fails: a string without any slash
/// is returned whole, and an empty string stays empty.
fn last_path_component(locator: &str) -> &str {
    let end = locator.find(|c: char| c == '?' || c == '#').unwrap_or(locator.len());
    let path = locator[..end].trim_end_matches('/');

    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
