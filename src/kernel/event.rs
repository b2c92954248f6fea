use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::cancel::UploadId;
use crate::audio::media::MediaElement;
use crate::audio::router::RoutingMode;
use crate::lyrics::segment::TranscriptionResult;

#[derive(Debug, Clone)]
pub enum Event {
    /// User and host signals (transport, mode, uploads)
    Input(InputEvent),
    /// Async result from the transcription collaborator
    Transcription {
        upload: UploadId,
        outcome: TranscriptionOutcome,
    },
}

#[derive(Debug, Clone)]
pub enum TranscriptionOutcome {
    Completed(TranscriptionResult),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct InputEvent {
    pub source: String,
    pub content: InputContent,
}

#[derive(Debug, Clone)]
pub enum InputContent {
    /// A new audio file: replaces the media element, routing and lyrics.
    LoadAudio { media: MediaElement, path: PathBuf },
    Play,
    Pause,
    TogglePlayback,
    Seek(f64),
    SetMode(RoutingMode),
    ToggleMode,
    SetVolume(f32),
    RecordingSaved(PathBuf),
    Unmount,
}

impl InputEvent {
    pub fn user(content: InputContent) -> Self {
        Self {
            source: "User".to_string(),
            content,
        }
    }
}

impl From<InputContent> for Event {
    fn from(content: InputContent) -> Self {
        Event::Input(InputEvent::user(content))
    }
}

/// Fire-and-forget notifications for the gamification store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    SongPlayed,
    RecordingMade,
}
