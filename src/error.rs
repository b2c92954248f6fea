use thiserror::Error;

use crate::audio::capture::CaptureError;
use crate::audio::error::RoutingError;

/// How conditions in the karaoke core surface to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// No processing context; native playback continues, karaoke is inert.
    #[error("audio processing unavailable")]
    UnsupportedPlatform,
    /// No segments to show yet. A UI state, not a failure.
    #[error("no lyrics available")]
    EmptyTranscript,
    /// A transcription result for an upload that has been superseded.
    #[error("transcription result belongs to a superseded upload")]
    StaleUploadResult,
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),
}

impl StudioError {
    /// Handled locally without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, StudioError::UnsupportedPlatform | StudioError::StaleUploadResult)
    }

    /// Routing failures that have a user-facing meaning.
    pub fn from_routing(e: &RoutingError) -> Option<Self> {
        match e {
            RoutingError::UnsupportedPlatform => Some(StudioError::UnsupportedPlatform),
            _ => None,
        }
    }

    pub fn user_message(&self) -> Option<String> {
        match self {
            StudioError::UnsupportedPlatform | StudioError::StaleUploadResult => None,
            StudioError::EmptyTranscript => Some("No lyrics yet".to_string()),
            StudioError::MicrophoneUnavailable(reason) => Some(format!(
                "Couldn't access a microphone ({}). Check that one is connected and allowed.",
                reason
            )),
        }
    }
}

impl From<CaptureError> for StudioError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::MicrophoneUnavailable(reason) => StudioError::MicrophoneUnavailable(reason),
            other => StudioError::MicrophoneUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_errors_have_no_message() {
        for e in [StudioError::UnsupportedPlatform, StudioError::StaleUploadResult] {
            assert!(e.is_silent());
            assert!(e.user_message().is_none());
        }
        let mic = StudioError::from(CaptureError::MicrophoneUnavailable("denied".into()));
        assert!(!mic.is_silent());
        assert!(mic.user_message().unwrap().contains("denied"));
    }
}
