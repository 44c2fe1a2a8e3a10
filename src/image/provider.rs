//! Adapter traits for remote image models.

use crate::error::Result;
use crate::image::types::{EditRequest, EditedImage, EncodedPayload};
use async_trait::async_trait;

/// Trait for services that edit an image according to an instruction.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Sends one edit request and returns the first image produced.
    async fn edit(&self, request: &EditRequest) -> Result<EditedImage>;

    /// Returns the name of this editor for display.
    fn name(&self) -> &str;
}

/// Trait for services that caption an image, producing a prompt seed.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    /// Sends one description request and returns the text verbatim.
    async fn describe(&self, payload: &EncodedPayload) -> Result<String>;
}
