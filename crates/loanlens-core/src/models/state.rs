use std::fmt;

use serde::{Deserialize, Serialize};

use super::photo::CapturedPhoto;
use super::submission::SubmissionReceipt;

/// Single source of truth a front-end renders from.
///
/// Transitions:
/// `AwaitingPermissions → Ready → Capturing → PreviewReady → Uploading → Completed`,
/// `PreviewReady → Ready` on retake, and `Uploading → Failed → PreviewReady`
/// when an upload fails. `Completed` is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PipelineState {
    AwaitingPermissions,
    Ready,
    Capturing,
    PreviewReady { photo: CapturedPhoto },
    Uploading,
    Completed { receipt: SubmissionReceipt },
    Failed { reason: String },
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::AwaitingPermissions => "awaiting_permissions",
            PipelineState::Ready => "ready",
            PipelineState::Capturing => "capturing",
            PipelineState::PreviewReady { .. } => "preview_ready",
            PipelineState::Uploading => "uploading",
            PipelineState::Completed { .. } => "completed",
            PipelineState::Failed { .. } => "failed",
        }
    }

    pub fn photo(&self) -> Option<&CapturedPhoto> {
        match self {
            PipelineState::PreviewReady { photo } => Some(photo),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
