use super::cancel::UploadId;
use super::time::Tick;
use crate::audio::router::RoutingMode;
use crate::lyrics::classify::LyricsState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptStatus {
    /// Nothing uploaded yet.
    Idle,
    /// Waiting on the transcription collaborator.
    Pending,
    Ready { segments: usize, rejected: usize },
    /// Transcription failed or came back malformed: shown as "no lyrics".
    Unavailable,
}

/// Strict state delta. This is the ONLY way state mutates.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    Tick(Tick),
    UploadStarted(UploadId),
    TranscriptApplied { segments: usize, rejected: usize },
    TranscriptUnavailable,
    Lyrics(LyricsState),
    ModeChanged(RoutingMode),
    VolumeChanged(f32),
    Playback { playing: bool, current_time: f64, duration: f64 },
    Degraded(bool),
    Released,
}

/// What the UI shell reads each tick.
#[derive(Debug, Clone)]
pub struct StudioState {
    // Monotonic version, bumped by every reduction
    pub version: u64,
    pub last_tick: Tick,

    pub upload: Option<UploadId>,
    pub transcript: TranscriptStatus,
    pub lyrics: LyricsState,

    pub mode: RoutingMode,
    pub volume: f32,
    pub degraded: bool,
    pub released: bool,

    pub playing: bool,
    pub current_time: f64,
    pub duration: f64,
}

impl Default for StudioState {
    fn default() -> Self {
        Self {
            version: 0,
            last_tick: Tick::new(),
            upload: None,
            transcript: TranscriptStatus::Idle,
            lyrics: LyricsState::NoLyrics,
            mode: RoutingMode::Normal,
            volume: 1.0,
            degraded: false,
            released: false,
            playing: false,
            current_time: 0.0,
            duration: 0.0,
        }
    }
}

impl StudioState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure reduction: State + Delta -> Mutated State
    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::Tick(t) => self.last_tick = t,
            StateDelta::UploadStarted(id) => {
                // Old lyrics never show against new audio
                self.upload = Some(id);
                self.transcript = TranscriptStatus::Pending;
                self.lyrics = LyricsState::NoLyrics;
                self.released = false;
                self.playing = false;
                self.current_time = 0.0;
            }
            StateDelta::TranscriptApplied { segments, rejected } => {
                self.transcript = TranscriptStatus::Ready { segments, rejected };
            }
            StateDelta::TranscriptUnavailable => {
                self.transcript = TranscriptStatus::Unavailable;
                self.lyrics = LyricsState::NoLyrics;
            }
            StateDelta::Lyrics(lyrics) => self.lyrics = lyrics,
            StateDelta::ModeChanged(mode) => self.mode = mode,
            StateDelta::VolumeChanged(volume) => self.volume = volume,
            StateDelta::Playback { playing, current_time, duration } => {
                self.playing = playing;
                self.current_time = current_time;
                self.duration = duration;
            }
            StateDelta::Degraded(degraded) => self.degraded = degraded,
            StateDelta::Released => {
                self.released = true;
                self.upload = None;
                self.transcript = TranscriptStatus::Idle;
                self.lyrics = LyricsState::NoLyrics;
                self.playing = false;
            }
        }
    }

    /// Karaoke toggle should be shown as unavailable.
    pub fn karaoke_available(&self) -> bool {
        !self.degraded && !self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reduction_bumps_version() {
        let mut state = StudioState::new();
        state.reduce(StateDelta::Tick(Tick { frame: 3 }));
        state.reduce(StateDelta::VolumeChanged(0.4));
        assert_eq!(state.version, 2);
        assert_eq!(state.last_tick.frame, 3);
        assert_eq!(state.volume, 0.4);
    }

    #[test]
    fn new_upload_clears_lyrics_and_marks_pending() {
        let mut state = StudioState::new();
        state.reduce(StateDelta::TranscriptApplied { segments: 4, rejected: 0 });
        state.reduce(StateDelta::UploadStarted(UploadId(uuid::Uuid::new_v4())));
        assert_eq!(state.transcript, TranscriptStatus::Pending);
        assert!(state.lyrics.is_empty());
    }
}
