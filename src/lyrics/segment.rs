use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One timestamped phrase of transcribed lyrics. Times are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self { text: text.into(), start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open: `start <= t < end`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn progress_at(&self, t: f64) -> f32 {
        ((t - self.start) / self.duration()).clamp(0.0, 1.0) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// What the transcription collaborator hands back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub words: Vec<WordTimestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NonFinite,
    NegativeStart,
    EmptyRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRejection {
    /// Position in the list as received.
    pub index: usize,
    pub reason: RejectReason,
}

/// Validated, start-ordered, read-only segment list.
#[derive(Debug, Clone)]
pub struct Transcript {
    segments: Arc<[TranscriptSegment]>,
    /// `max_end[i]` = largest `end` among segments `0..=i`.
    max_end: Arc<[f64]>,
    ends_sorted: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::empty()
    }
}

impl Transcript {
    pub fn empty() -> Self {
        Self {
            segments: Vec::<TranscriptSegment>::new().into(),
            max_end: Vec::<f64>::new().into(),
            ends_sorted: true,
        }
    }

    /// Bad segments are skipped one by one; the rest survive.
    pub fn from_segments(raw: Vec<TranscriptSegment>) -> (Self, Vec<SegmentRejection>) {
        let mut rejected = Vec::new();
        let mut kept: Vec<TranscriptSegment> = Vec::with_capacity(raw.len());

        for (index, segment) in raw.into_iter().enumerate() {
            let reason = if !segment.start.is_finite() || !segment.end.is_finite() {
                Some(RejectReason::NonFinite)
            } else if segment.start < 0.0 {
                Some(RejectReason::NegativeStart)
            } else if segment.start >= segment.end {
                Some(RejectReason::EmptyRange)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    debug!("Skipping segment {} ({:?})", index, reason);
                    rejected.push(SegmentRejection { index, reason });
                }
                None => kept.push(segment),
            }
        }

        kept.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut max_end = Vec::with_capacity(kept.len());
        let mut running = f64::NEG_INFINITY;
        let mut ends_sorted = true;
        for segment in &kept {
            if segment.end < running {
                ends_sorted = false;
            }
            running = running.max(segment.end);
            max_end.push(running);
        }

        let transcript = Self {
            segments: kept.into(),
            max_end: max_end.into(),
            ends_sorted,
        };
        (transcript, rejected)
    }

    pub fn from_result(result: TranscriptionResult) -> (Self, Vec<SegmentRejection>) {
        Self::from_segments(result.segments)
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptSegment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest end over all segments; 0 when empty.
    pub fn end_time(&self) -> f64 {
        self.max_end.last().copied().unwrap_or(0.0)
    }

    pub(crate) fn max_end_through(&self, index: usize) -> f64 {
        self.max_end[index]
    }

    pub(crate) fn ends_sorted(&self) -> bool {
        self.ends_sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_segments_are_skipped_individually() {
        let (transcript, rejected) = Transcript::from_segments(vec![
            TranscriptSegment::new("ok", 0.0, 1.0),
            TranscriptSegment::new("flat", 2.0, 2.0),
            TranscriptSegment::new("nan", f64::NAN, 3.0),
            TranscriptSegment::new("neg", -1.0, 0.5),
            TranscriptSegment::new("also ok", 1.0, 2.0),
        ]);

        assert_eq!(transcript.len(), 2);
        assert_eq!(
            rejected.iter().map(|r| (r.index, r.reason)).collect::<Vec<_>>(),
            vec![
                (1, RejectReason::EmptyRange),
                (2, RejectReason::NonFinite),
                (3, RejectReason::NegativeStart),
            ]
        );
    }

    #[test]
    fn survivors_are_ordered_by_start() {
        let (transcript, _) = Transcript::from_segments(vec![
            TranscriptSegment::new("b", 3.0, 4.0),
            TranscriptSegment::new("a", 0.0, 10.0),
        ]);
        assert_eq!(transcript.segments()[0].text, "a");
        assert_eq!(transcript.end_time(), 10.0);
        assert!(!transcript.ends_sorted());
        assert_eq!(transcript.max_end_through(1), 10.0);
    }

    #[test]
    fn missing_fields_in_result_default_to_empty() {
        let result: TranscriptionResult = serde_json::from_str("{}").unwrap();
        assert!(result.segments.is_empty() && result.words.is_empty());
        assert!(Transcript::empty().is_empty());
        assert_eq!(Transcript::empty().end_time(), 0.0);
    }
}
