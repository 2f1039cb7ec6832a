use serde::Serialize;

use super::error::CaptureError;

/// Why the microphone could not be attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum MicrophoneIssue {
    /// The user denied access; the presentation layer may offer settings.
    PermissionDenied,
    /// The prompt was abandoned or timed out.
    Unresolved(String),
    /// Access was granted but the audio input could not be added.
    AttachFailed(String),
}

/// A capability the session runs without.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedCapability {
    AudioUnavailable(MicrophoneIssue),
}

/// Outcome of a `start()` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ConfigurationResult {
    Success,
    PartialSuccess(DegradedCapability),
    Failure(CaptureError),
}

impl ConfigurationResult {
    /// True when the session reached `Running`, with or without audio.
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    pub fn is_audio_unavailable(&self) -> bool {
        matches!(
            self,
            Self::PartialSuccess(DegradedCapability::AudioUnavailable(_))
        )
    }

    pub fn failure(&self) -> Option<&CaptureError> {
        match self {
            Self::Failure(err) => Some(err),
            _ => None,
        }
    }
}
