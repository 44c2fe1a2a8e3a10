//! Core types for image editing.

use crate::error::{EditorError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image formats a file picker is expected to hand over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// A user-supplied image with the media type its source declared.
///
/// The type is taken from whoever handed the file over (a picker, a drop
/// event, a file extension) and is never sniffed from the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Original file name, if known.
    pub name: Option<String>,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    /// Creates an asset from raw bytes and a declared media type.
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            name: None,
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Sets the original file name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reads a file, declaring its type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream`, which
    /// [`is_image`](Self::is_image) rejects.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let media_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");

        let mut asset = Self::new(bytes, media_type);
        asset.name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(asset)
    }

    /// Returns true if the declared type is an image type.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Returns the size of the asset in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Base64 text of an asset plus its declared media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPayload {
    /// Base64-encoded bytes (standard alphabet, padded).
    pub data: String,
    /// Media type copied from the asset.
    pub media_type: String,
}

impl EncodedPayload {
    /// Splits a `data:<type>;base64,<data>` URI into a payload.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let parts: Vec<&str> = uri.split(',').collect();
        let [header, data] = parts.as_slice() else {
            return Err(EditorError::Encoding("invalid data URL format".into()));
        };

        let media_type = header
            .split_once(':')
            .and_then(|(_, rest)| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .filter(|mime| !mime.is_empty())
            .ok_or_else(|| {
                EditorError::Encoding("could not determine MIME type from data URL".into())
            })?;

        Ok(Self {
            data: (*data).to_string(),
            media_type: media_type.to_string(),
        })
    }

    /// Rebuilds the data URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Decodes the base64 text back to bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| EditorError::Encoding(e.to_string()))
    }
}

/// A request to edit an image.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// The encoded source image.
    pub payload: EncodedPayload,
    /// What to change.
    pub instruction: String,
}

impl EditRequest {
    /// Creates a new edit request.
    pub fn new(payload: EncodedPayload, instruction: impl Into<String>) -> Self {
        Self {
            payload,
            instruction: instruction.into(),
        }
    }
}

/// An edited image returned by the model, as a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "edited image should be displayed or saved"]
pub struct EditedImage {
    /// `data:<type>;base64,<data>`
    pub data_uri: String,
}

impl EditedImage {
    /// Builds the image from the model's inline data.
    pub fn from_inline(media_type: &str, data: &str) -> Self {
        Self {
            data_uri: format!("data:{media_type};base64,{data}"),
        }
    }

    /// Returns the media type the model declared.
    pub fn media_type(&self) -> Option<&str> {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
    }

    /// Decodes the image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        EncodedPayload::from_data_uri(&self.data_uri)?.decode()
    }

    /// Suggested file name for a download.
    pub fn suggested_file_name(&self) -> String {
        let ext = self
            .media_type()
            .and_then(ImageFormat::from_mime_type)
            .unwrap_or(ImageFormat::Png)
            .extension();
        format!("edited-image.{ext}")
    }

    /// Saves the decoded image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.decode()?)?;
        Ok(())
    }
}
