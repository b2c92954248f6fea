use tracing::debug;

use super::classify::{classify, LyricsState};
use super::segment::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LyricsUpdate {
    pub state: LyricsState,
    /// Set only on the tick where the active segment changed.
    pub scroll: Option<ScrollRequest>,
}

/// Follows the playback clock and turns active-segment changes into
/// one-shot scroll requests.
#[derive(Debug, Default)]
pub struct LyricsTracker {
    transcript: Transcript,
    last_active: Option<usize>,
}

impl LyricsTracker {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            last_active: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Swap in a new list and forget the previous transition.
    pub fn replace(&mut self, transcript: Transcript) {
        self.transcript = transcript;
        self.last_active = None;
    }

    pub fn clear(&mut self) {
        self.replace(Transcript::empty());
    }

    pub fn update(&mut self, current_time: f64) -> LyricsUpdate {
        let state = classify(&self.transcript, current_time);
        let active = state.active();

        let scroll = if active != self.last_active {
            debug!("Active segment {:?} -> {:?} at {:.3}s", self.last_active, active, current_time);
            self.last_active = active;
            active.map(|index| ScrollRequest { index })
        } else {
            None
        };

        LyricsUpdate { state, scroll }
    }

    pub fn last_active(&self) -> Option<usize> {
        self.last_active
    }
}
