//! Active-segment classification.
//!
//! Boundary policy: segments are half-open `[start, end)`, so a timestamp on
//! a shared edge belongs to the segment that starts there. When segments
//! overlap, the latest-starting one that contains the time wins. In a gap
//! (or after the last segment) the most recent segment stays highlighted
//! with progress 1; before the first segment nothing is active.

use super::segment::{Transcript, TranscriptSegment};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LyricsPosition {
    pub active: Option<usize>,
    /// Fraction of the active segment played, 0..=1.
    pub progress: f32,
    /// Segments whose `end <= t`.
    pub past_count: usize,
    /// Whole-transcript completion, clamped to 0..=1.
    pub completion: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LyricsState {
    /// No segments yet (or transcription produced none). Not an error.
    NoLyrics,
    Timed(LyricsPosition),
}

impl LyricsState {
    pub fn active(&self) -> Option<usize> {
        match self {
            LyricsState::NoLyrics => None,
            LyricsState::Timed(pos) => pos.active,
        }
    }

    pub fn progress(&self) -> f32 {
        match self {
            LyricsState::NoLyrics => 0.0,
            LyricsState::Timed(pos) => pos.progress,
        }
    }

    pub fn completion(&self) -> f32 {
        match self {
            LyricsState::NoLyrics => 0.0,
            LyricsState::Timed(pos) => pos.completion,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LyricsState::NoLyrics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPhase {
    Past,
    Active,
    Future,
}

/// Where `t` sits relative to one segment's own range.
pub fn segment_phase(segment: &TranscriptSegment, t: f64) -> SegmentPhase {
    if t < segment.start {
        SegmentPhase::Future
    } else if t < segment.end {
        SegmentPhase::Active
    } else {
        SegmentPhase::Past
    }
}

/// Pure; safe to call on every clock tick.
pub fn classify(transcript: &Transcript, current_time: f64) -> LyricsState {
    if transcript.is_empty() {
        return LyricsState::NoLyrics;
    }

    let t = if current_time.is_finite() { current_time } else { 0.0 };
    let segments = transcript.segments();

    let end_time = transcript.end_time();
    let completion = if end_time > 0.0 {
        (t / end_time).clamp(0.0, 1.0) as f32
    } else {
        0.0
    };

    // Number of segments that have started by `t`
    let started = segments.partition_point(|s| s.start <= t);
    let past_count = if transcript.ends_sorted() {
        segments.partition_point(|s| s.end <= t)
    } else {
        segments[..started].iter().filter(|s| s.end <= t).count()
    };

    if started == 0 {
        return LyricsState::Timed(LyricsPosition {
            active: None,
            progress: 0.0,
            past_count,
            completion,
        });
    }

    let latest = started - 1;
    let mut i = latest;
    // Walk back only while some earlier segment can still reach past `t`
    while transcript.max_end_through(i) > t {
        let segment = &segments[i];
        if segment.contains(t) {
            return LyricsState::Timed(LyricsPosition {
                active: Some(i),
                progress: segment.progress_at(t),
                past_count,
                completion,
            });
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    LyricsState::Timed(LyricsPosition {
        active: Some(latest),
        progress: 1.0,
        past_count,
        completion,
    })
}
