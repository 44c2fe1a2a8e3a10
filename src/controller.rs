//! Interaction controller.
//!
//! Owns everything the editor screen shows and moves between phases only
//! through the methods below:
//!
//! ```text
//! Idle --select--> AssetSelected --begin_description--> Describing --finish--> AssetSelected
//!                  AssetSelected --begin_edit---------> Generating --finish--> AssetSelected
//! any  --reset---> Idle
//! ```
//!
//! Calls are never cancelled. Each `begin_*` hands out a ticket with a fresh
//! sequence token, and `finish_*` drops any completion whose token is no
//! longer the one in flight (after a reset, for instance).

use crate::error::Result;
use crate::image::{encode, EditRequest, EditedImage, ImageAsset, ImageDescriber, ImageEditor};
use crate::preview::{PreviewStore, PreviewUrl};
use std::sync::Arc;

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No asset selected.
    #[default]
    Idle,
    /// Asset present, nothing in flight.
    AssetSelected,
    /// Description request in flight.
    Describing,
    /// Edit request in flight.
    Generating,
}

/// What happened to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The controller was not in a state that allows the request.
    Ignored,
    /// The call succeeded and its result was stored.
    Applied,
    /// The call failed and its error was recorded.
    Failed,
    /// The call completed after being superseded; its result was dropped.
    Stale,
}

/// A description call handed out by [`EditorController::begin_description`].
#[derive(Debug, Clone)]
pub struct DescriptionTicket {
    token: u64,
    asset: Arc<ImageAsset>,
}

impl DescriptionTicket {
    /// Sequence token of this call.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// The asset being described.
    pub fn asset(&self) -> &ImageAsset {
        &self.asset
    }

    /// Encodes the asset and asks the describer for a caption.
    pub async fn run<D: ImageDescriber + ?Sized>(&self, describer: &D) -> Result<String> {
        let payload = encode(&self.asset)?;
        describer.describe(&payload).await
    }
}

/// An edit call handed out by [`EditorController::begin_edit`].
#[derive(Debug, Clone)]
pub struct EditTicket {
    token: u64,
    asset: Arc<ImageAsset>,
    instruction: String,
}

impl EditTicket {
    /// Sequence token of this call.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// The instruction captured when the call started.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Encodes the asset and asks the editor for a new image.
    pub async fn run<E: ImageEditor + ?Sized>(&self, editor: &E) -> Result<EditedImage> {
        let payload = encode(&self.asset)?;
        editor
            .edit(&EditRequest::new(payload, self.instruction.clone()))
            .await
    }
}

/// Snapshot of everything a presentation surface needs to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    /// Current phase.
    pub phase: Phase,
    /// Preview of the selected asset.
    pub preview: Option<PreviewUrl>,
    /// Instruction text box contents.
    pub instruction: String,
    /// Data URI of the last edited image.
    pub result_uri: Option<String>,
    /// Error banner text.
    pub error: Option<String>,
    /// Whether the describe button is enabled.
    pub can_describe: bool,
    /// Whether the generate button is enabled.
    pub can_generate: bool,
    /// Whether a call is in flight.
    pub is_busy: bool,
    /// Short label for the busy indicator.
    pub status: Option<&'static str>,
}

/// State machine behind the editor screen.
#[derive(Debug, Default)]
pub struct EditorController {
    phase: Phase,
    asset: Option<Arc<ImageAsset>>,
    preview: Option<PreviewUrl>,
    previews: PreviewStore,
    instruction: String,
    result: Option<EditedImage>,
    error: Option<String>,
    next_token: u64,
    in_flight: Option<u64>,
}

impl EditorController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Selected asset, if any.
    pub fn asset(&self) -> Option<&ImageAsset> {
        self.asset.as_deref()
    }

    /// Current instruction text.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Last edited image, if any.
    pub fn result(&self) -> Option<&EditedImage> {
        self.result.as_ref()
    }

    /// Last recorded error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Handle of the live preview, if any.
    pub fn preview(&self) -> Option<&PreviewUrl> {
        self.preview.as_ref()
    }

    /// Live preview registry, for hosts that resolve handles to pixels.
    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Describing | Phase::Generating)
    }

    /// Selects a new asset, replacing any previous one.
    ///
    /// Clears the previous result and error. Returns false while a call is
    /// in flight.
    pub fn select_asset(&mut self, asset: ImageAsset) -> bool {
        if self.is_busy() {
            tracing::debug!(phase = ?self.phase, "ignoring asset selection while busy");
            return false;
        }

        let asset = Arc::new(asset);
        self.release_preview();
        self.preview = Some(self.previews.create(asset.clone()));
        tracing::debug!(
            name = asset.name.as_deref().unwrap_or("<unnamed>"),
            media_type = %asset.media_type,
            size = asset.size(),
            "asset selected"
        );

        self.asset = Some(asset);
        self.result = None;
        self.error = None;
        self.phase = Phase::AssetSelected;
        true
    }

    /// Selects an asset that arrived through drag and drop.
    ///
    /// Drops that do not declare an image type are ignored.
    pub fn select_dropped_asset(&mut self, asset: ImageAsset) -> bool {
        if !asset.is_image() {
            tracing::warn!(media_type = %asset.media_type, "rejected non-image drop");
            return false;
        }
        self.select_asset(asset)
    }

    /// Replaces the instruction text. Returns false while a call is in flight.
    pub fn set_instruction(&mut self, instruction: impl Into<String>) -> bool {
        if self.is_busy() {
            return false;
        }
        self.instruction = instruction.into();
        true
    }

    /// Starts a description call.
    pub fn begin_description(&mut self) -> Option<DescriptionTicket> {
        if self.phase != Phase::AssetSelected {
            return None;
        }
        let asset = self.asset.clone()?;

        let token = self.issue_token();
        self.error = None;
        self.phase = Phase::Describing;
        Some(DescriptionTicket { token, asset })
    }

    /// Applies the result of a description call.
    pub fn finish_description(
        &mut self,
        ticket: DescriptionTicket,
        result: Result<String>,
    ) -> Outcome {
        if !self.accepts(ticket.token) {
            return Outcome::Stale;
        }
        self.in_flight = None;
        self.phase = Phase::AssetSelected;

        match result {
            Ok(text) => {
                self.instruction = text;
                Outcome::Applied
            }
            Err(e) => {
                self.record_error(format!("Failed to describe image: {e}"));
                Outcome::Failed
            }
        }
    }

    /// Starts an edit call. Requires an asset and a non-empty instruction.
    pub fn begin_edit(&mut self) -> Option<EditTicket> {
        if self.phase != Phase::AssetSelected || self.instruction.trim().is_empty() {
            return None;
        }
        let asset = self.asset.clone()?;

        let token = self.issue_token();
        self.error = None;
        self.result = None;
        self.phase = Phase::Generating;
        Some(EditTicket {
            token,
            asset,
            instruction: self.instruction.clone(),
        })
    }

    /// Applies the result of an edit call.
    pub fn finish_edit(&mut self, ticket: EditTicket, result: Result<EditedImage>) -> Outcome {
        if !self.accepts(ticket.token) {
            return Outcome::Stale;
        }
        self.in_flight = None;
        self.phase = Phase::AssetSelected;

        match result {
            Ok(image) => {
                self.result = Some(image);
                Outcome::Applied
            }
            Err(e) => {
                self.record_error(format!("Failed to generate image: {e}"));
                Outcome::Failed
            }
        }
    }

    /// Describes the selected asset and stores the text as the instruction.
    pub async fn request_description<D: ImageDescriber + ?Sized>(
        &mut self,
        describer: &D,
    ) -> Outcome {
        let Some(ticket) = self.begin_description() else {
            return Outcome::Ignored;
        };
        let result = ticket.run(describer).await;
        self.finish_description(ticket, result)
    }

    /// Edits the selected asset with the current instruction.
    pub async fn request_edit<E: ImageEditor + ?Sized>(&mut self, editor: &E) -> Outcome {
        let Some(ticket) = self.begin_edit() else {
            return Outcome::Ignored;
        };
        tracing::debug!(editor = editor.name(), token = ticket.token, "starting edit");
        let result = ticket.run(editor).await;
        self.finish_edit(ticket, result)
    }

    /// Clears asset, instruction, result and error from any phase.
    pub fn reset(&mut self) {
        if let Some(token) = self.in_flight.take() {
            tracing::debug!(token, "reset with a call in flight");
        }
        self.release_preview();
        self.asset = None;
        self.instruction.clear();
        self.result = None;
        self.error = None;
        self.phase = Phase::Idle;
    }

    /// Projects the current state for drawing.
    pub fn render(&self) -> EditorView {
        let idle = self.phase == Phase::AssetSelected;
        EditorView {
            phase: self.phase,
            preview: self.preview.clone(),
            instruction: self.instruction.clone(),
            result_uri: self.result.as_ref().map(|r| r.data_uri.clone()),
            error: self.error.clone(),
            can_describe: idle && self.asset.is_some(),
            can_generate: idle && self.asset.is_some() && !self.instruction.trim().is_empty(),
            is_busy: self.is_busy(),
            status: match self.phase {
                Phase::Describing => Some("Describing..."),
                Phase::Generating => Some("Generating..."),
                _ => None,
            },
        }
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.in_flight = Some(self.next_token);
        self.next_token
    }

    fn accepts(&self, token: u64) -> bool {
        if self.in_flight == Some(token) {
            return true;
        }
        tracing::warn!(token, in_flight = ?self.in_flight, "discarding stale completion");
        false
    }

    fn record_error(&mut self, message: String) {
        tracing::error!("{message}");
        self.error = Some(message);
    }

    fn release_preview(&mut self) {
        if let Some(url) = self.preview.take() {
            self.previews.revoke(&url);
        }
    }
}
