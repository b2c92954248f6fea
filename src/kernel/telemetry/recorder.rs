use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

const MAX_EVENTS: usize = 10_000;

#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        // Delegate to pure functional metrics module
        compute_snapshot(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Called on shutdown.
    pub fn aggregate_session(&self, duration_ticks: u64) -> TelemetryEvent {
        let snap = self.snapshot();
        TelemetryEvent::SessionSummary {
            duration_ticks,
            mode_switches: snap.routing.switches,
            segment_transitions: snap.lyrics.transitions,
            songs_played: snap.progress.songs_played,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::telemetry::event::LifecycleEvent;

    #[test]
    fn buffer_is_bounded() {
        let mut recorder = TelemetryRecorder::new();
        for _ in 0..MAX_EVENTS + 5 {
            recorder.record(TelemetryEvent::PlatformDegraded);
        }
        assert_eq!(recorder.len(), MAX_EVENTS);
    }

    #[test]
    fn session_summary_folds_counters() {
        let mut recorder = TelemetryRecorder::new();
        recorder.record(TelemetryEvent::Lifecycle(LifecycleEvent::SongPlayed));
        match recorder.aggregate_session(120) {
            TelemetryEvent::SessionSummary { duration_ticks, songs_played, .. } => {
                assert_eq!(duration_ticks, 120);
                assert_eq!(songs_played, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
