use std::collections::VecDeque;

use super::event::{LifecycleEvent, TelemetryEvent};
use crate::audio::router::RoutingMode;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub routing: RoutingStats,
    pub lyrics: LyricsStats,
    pub uploads: UploadStats,
    pub progress: ProgressStats,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingStats {
    pub switches: u64,
    pub karaoke_entries: u64,
    pub unavailable_requests: u64,
    pub degraded_attaches: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LyricsStats {
    pub transitions: u64,
    pub transcripts_loaded: u64,
    pub segments_loaded: u64,
    pub segments_rejected: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UploadStats {
    pub started: u64,
    pub stale_discarded: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressStats {
    pub songs_played: u64,
    pub recordings: u64,
    pub releases: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::ModeSwitched { to, .. } => {
                snap.routing.switches += 1;
                if *to == RoutingMode::Karaoke {
                    snap.routing.karaoke_entries += 1;
                }
            }
            TelemetryEvent::ModeUnavailable { .. } => snap.routing.unavailable_requests += 1,
            TelemetryEvent::PlatformDegraded => snap.routing.degraded_attaches += 1,
            TelemetryEvent::SegmentTransition { .. } => snap.lyrics.transitions += 1,
            TelemetryEvent::TranscriptLoaded { segments, rejected } => {
                snap.lyrics.transcripts_loaded += 1;
                snap.lyrics.segments_loaded += *segments as u64;
                snap.lyrics.segments_rejected += *rejected as u64;
            }
            TelemetryEvent::TranscriptionFailed => snap.lyrics.failures += 1,
            TelemetryEvent::StaleResultDiscarded { .. } => snap.uploads.stale_discarded += 1,
            TelemetryEvent::Lifecycle(kind) => match kind {
                LifecycleEvent::UploadStarted => snap.uploads.started += 1,
                LifecycleEvent::SongPlayed => snap.progress.songs_played += 1,
                LifecycleEvent::RecordingMade => snap.progress.recordings += 1,
                LifecycleEvent::Released => snap.progress.releases += 1,
            },
            TelemetryEvent::SessionSummary { .. } => {}
        }
    }

    snap
}
