use serde::{Deserialize, Serialize};

use crate::audio::router::RoutingMode;
use crate::kernel::cancel::UploadId;
use crate::kernel::time::Tick;

// Allowed: IDs, Timestamps, Indices, Counts, Enums
// Forbidden: Lyric text, Audio frames, File paths

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    ModeSwitched {
        from: RoutingMode,
        to: RoutingMode,
        tick: Tick,
    },

    ModeUnavailable {
        tick: Tick,
    },

    PlatformDegraded,

    SegmentTransition {
        from: Option<usize>,
        to: Option<usize>,
        tick: Tick,
    },

    TranscriptLoaded {
        segments: usize,
        rejected: usize,
    },

    TranscriptionFailed,

    StaleResultDiscarded {
        upload: UploadId,
    },

    Lifecycle(LifecycleEvent),

    SessionSummary {
        duration_ticks: u64,
        mode_switches: u64,
        segment_transitions: u64,
        songs_played: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    UploadStarted,
    SongPlayed,
    RecordingMade,
    Released,
}
