use serde::{Deserialize, Serialize};

use crate::types::GeneratedImage;

/// Notifications broadcast by a [`GenerationLoop`](crate::GenerationLoop).
///
/// Every event carries the epoch of the run it belongs to, so a UI can
/// ignore anything from a run it has already moved past.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LoopEvent {
    /// A run began. `prompt_count` may be zero.
    #[serde(rename_all = "camelCase")]
    Started { epoch: u64, prompt_count: usize },

    /// A request was sent to the backend.
    #[serde(rename_all = "camelCase")]
    RequestIssued {
        epoch: u64,
        index: usize,
        prompt: String,
    },

    /// A result was appended to the result sequence.
    #[serde(rename_all = "camelCase")]
    ImageGenerated {
        epoch: u64,
        index: usize,
        image: GeneratedImage,
    },

    /// A response arrived for a run that had already been stopped.
    #[serde(rename_all = "camelCase")]
    ResultDiscarded { epoch: u64, index: usize },

    /// The backend failed; the run is over and the loop is idle.
    #[serde(rename_all = "camelCase")]
    Failed {
        epoch: u64,
        index: usize,
        error: String,
    },

    /// The run was stopped by the user or by a prompt change.
    #[serde(rename_all = "camelCase")]
    Stopped { epoch: u64 },
}

impl LoopEvent {
    /// Channel-style name, e.g. `loop:image_generated`.
    pub fn name(&self) -> &'static str {
        match self {
            LoopEvent::Started { .. } => "loop:started",
            LoopEvent::RequestIssued { .. } => "loop:request_issued",
            LoopEvent::ImageGenerated { .. } => "loop:image_generated",
            LoopEvent::ResultDiscarded { .. } => "loop:result_discarded",
            LoopEvent::Failed { .. } => "loop:failed",
            LoopEvent::Stopped { .. } => "loop:stopped",
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            LoopEvent::Started { epoch, .. }
            | LoopEvent::RequestIssued { epoch, .. }
            | LoopEvent::ImageGenerated { epoch, .. }
            | LoopEvent::ResultDiscarded { epoch, .. }
            | LoopEvent::Failed { epoch, .. }
            | LoopEvent::Stopped { epoch } => *epoch,
        }
    }
}
