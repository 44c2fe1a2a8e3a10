//! Binary-to-text encoding of image assets.

use crate::error::{EditorError, Result};
use crate::image::types::{EncodedPayload, ImageAsset};
use base64::Engine;
use std::path::Path;

/// Encodes an asset as base64 text plus its declared media type.
///
/// The asset is first rendered as a full data URI and then split again, so a
/// payload always round-trips through [`EncodedPayload::to_data_uri`].
///
/// A declared type carrying parameters (`image/png;name=a`) is rejected: the
/// header split would keep only `image/png`.
pub fn encode(asset: &ImageAsset) -> Result<EncodedPayload> {
    if asset.media_type.contains(';') {
        return Err(EditorError::Encoding(format!(
            "unsupported media type parameters in {:?}",
            asset.media_type
        )));
    }
    let uri = format!(
        "data:{};base64,{}",
        asset.media_type,
        base64::engine::general_purpose::STANDARD.encode(&asset.bytes)
    );
    EncodedPayload::from_data_uri(&uri)
}

/// Reads a file and encodes it.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<EncodedPayload> {
    let asset = ImageAsset::from_path(path).await?;
    encode(&asset)
}
