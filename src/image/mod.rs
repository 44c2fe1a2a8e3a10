//! Image encoding, adapters and core types.

pub mod encoder;
mod provider;
#[cfg(feature = "gemini")]
pub mod providers;
mod types;

pub use encoder::{encode, encode_file};
pub use provider::{ImageDescriber, ImageEditor};
pub use types::{EditRequest, EditedImage, EncodedPayload, ImageAsset, ImageFormat};
