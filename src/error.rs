//! Error types for image encoding, editing and description.

/// Generic guidance shown when the model silently declines to draw.
pub const NO_IMAGE_GUIDANCE: &str = "the model did not return an image. \
     Try rephrasing the instruction to describe a concrete visual change";

/// Longest API error message kept verbatim.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while encoding, describing or editing an image.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The local asset could not be turned into a payload.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Network failure, a 5xx status, or an unreadable response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// API rejected the request with a 4xx status.
    ///
    /// Server-side (5xx) statuses are infrastructure failures and surface as
    /// [`Transport`](Self::Transport) instead.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing credential or invalid client settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// The whole request was blocked by a content policy.
    #[error("request blocked: {reason}{}", .message.as_ref().map(|m| format!(" ({m})")).unwrap_or_default())]
    Blocked {
        reason: String,
        message: Option<String>,
    },

    /// The model declined and said why.
    #[error("model refused: {0}")]
    ModelRefused(String),

    /// The model stopped for a reason other than "no image".
    #[error("generation stopped: {0}")]
    OtherFinish(String),

    /// The model answered with text where an image was requested.
    #[error("model returned text instead of an image: {0}")]
    WrongModality(String),

    /// The model declined without giving a reason.
    #[error("no image produced: {}", NO_IMAGE_GUIDANCE)]
    NoImageProduced,

    /// The description came back blank.
    #[error("the model returned an empty description")]
    EmptyResult,

    /// No diagnostic available in the response.
    #[error("no image data found in the API response")]
    Unknown,

    /// I/O error (reading an asset or saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    /// Returns true if the model (rather than the client or network) declined.
    pub fn is_model_decline(&self) -> bool {
        matches!(
            self,
            Self::Blocked { .. }
                | Self::ModelRefused(_)
                | Self::OtherFinish(_)
                | Self::WrongModality(_)
                | Self::NoImageProduced
                | Self::EmptyResult
        )
    }
}

#[cfg(feature = "gemini")]
impl From<reqwest::Error> for EditorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response: {err}"))
    }
}

/// Extracts a readable message from an API error body.
///
/// Google wraps errors as `{"error": {"message": ...}}`; anything else is kept
/// as-is. The result is trimmed and capped so a stray HTML page does not end
/// up in a UI banner.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_owned());

    if message.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = message.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        message
    }
}

/// Result type alias for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;
