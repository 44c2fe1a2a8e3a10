//! Preview handles for selected assets.
//!
//! A host renders the selected image through a [`PreviewUrl`]. Every handle
//! must be revoked once superseded, otherwise the store keeps the asset alive.

use crate::image::ImageAsset;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to a registered preview, e.g. `preview:3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewUrl(String);

impl PreviewUrl {
    /// Returns the handle as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live previews.
#[derive(Debug, Default)]
pub struct PreviewStore {
    next_id: u64,
    live: HashMap<PreviewUrl, Arc<ImageAsset>>,
}

impl PreviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset and returns its handle.
    pub fn create(&mut self, asset: Arc<ImageAsset>) -> PreviewUrl {
        self.next_id += 1;
        let url = PreviewUrl(format!("preview:{}", self.next_id));
        self.live.insert(url.clone(), asset);
        url
    }

    /// Looks up the asset behind a live handle.
    pub fn resolve(&self, url: &PreviewUrl) -> Option<&ImageAsset> {
        self.live.get(url).map(Arc::as_ref)
    }

    /// Releases a handle. Returns false if it was not live.
    pub fn revoke(&mut self, url: &PreviewUrl) -> bool {
        self.live.remove(url).is_some()
    }

    /// Number of live previews.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if no previews are live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
