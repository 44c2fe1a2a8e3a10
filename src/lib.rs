#![warn(missing_docs)]
//! gemedit - edit images with Gemini.
//!
//! The crate turns a user-supplied image into a base64 payload, asks Gemini
//! to caption or edit it, and classifies every way the model can decline.
//! [`EditorController`] sequences those calls for an interactive host.
//!
//! # Quick Start
//!
//! ```no_run
//! use gemedit::{encode, EditRequest, GeminiProvider, ImageAsset, ImageEditor};
//!
//! #[tokio::main]
//! async fn main() -> gemedit::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let asset = ImageAsset::from_path("photo.png").await?;
//!     let request = EditRequest::new(encode(&asset)?, "Add a warm sunset glow");
//!     let image = provider.edit(&request).await?;
//!     image.save("edited.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Driving the editor
//!
//! ```no_run
//! use gemedit::{EditorController, GeminiProvider, ImageAsset, Outcome};
//!
//! # async fn run() -> gemedit::Result<()> {
//! let provider = GeminiProvider::builder().build()?;
//! let mut editor = EditorController::new();
//!
//! editor.select_asset(ImageAsset::from_path("photo.png").await?);
//! editor.request_description(&provider).await;
//! if editor.request_edit(&provider).await == Outcome::Applied {
//!     println!("{}", editor.render().result_uri.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `gemini` (default): the Gemini REST provider.

pub mod controller;
mod error;
pub mod image;
pub mod preview;

// Re-export error types at crate root
pub use error::{EditorError, Result, NO_IMAGE_GUIDANCE};

pub use controller::{DescriptionTicket, EditTicket, EditorController, EditorView, Outcome, Phase};
pub use image::{
    encode, encode_file, EditRequest, EditedImage, EncodedPayload, ImageAsset, ImageDescriber,
    ImageEditor, ImageFormat,
};
pub use preview::{PreviewStore, PreviewUrl};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::controller::{EditorController, Outcome, Phase};
    pub use crate::error::{EditorError, Result};
    pub use crate::image::{EditRequest, EditedImage, ImageAsset, ImageDescriber, ImageEditor};

    #[cfg(feature = "gemini")]
    pub use crate::image::providers::GeminiProvider;
}
