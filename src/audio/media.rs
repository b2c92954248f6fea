use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::frame::StereoSample;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("wav decode failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("media contains no audio frames")]
    Empty,
}

/// Read side of the host media element.
pub trait PlaybackClock {
    /// Seconds. Monotonic while playing, jumps only on seek.
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn is_playing(&self) -> bool;
}

/// User transport controls.
pub trait Transport: PlaybackClock {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded, playable audio buffer with a playhead.
///
/// Cloning shares the decoded frames and keeps the same `MediaId`.
#[derive(Clone)]
pub struct MediaElement {
    id: MediaId,
    frames: Arc<[StereoSample]>,
    sample_rate: u32,
    cursor: usize,
    playing: bool,
    ended: bool,
}

impl fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaElement")
            .field("id", &self.id)
            .field("frames", &self.frames.len())
            .field("sample_rate", &self.sample_rate)
            .field("cursor", &self.cursor)
            .field("playing", &self.playing)
            .finish()
    }
}

impl MediaElement {
    pub fn from_frames(frames: Vec<StereoSample>, sample_rate: u32) -> Self {
        Self {
            id: MediaId::new(),
            frames: frames.into(),
            sample_rate: sample_rate.max(1),
            cursor: 0,
            playing: false,
            ended: false,
        }
    }

    /// Decode a WAV file, converting to stereo at `target_rate`.
    pub fn open_wav<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let full_scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
        };

        if samples.len() < channels {
            return Err(MediaError::Empty);
        }

        let mut left = Vec::with_capacity(samples.len() / channels);
        let mut right = Vec::with_capacity(samples.len() / channels);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }

        info!(
            "Loaded {}: {} frames @ {}Hz, {} channel(s)",
            path.display(),
            left.len(),
            spec.sample_rate,
            channels
        );

        if spec.sample_rate != target_rate && target_rate > 0 {
            let resampled = resample(vec![left, right], spec.sample_rate, target_rate)?;
            let mut waves = resampled.into_iter();
            left = waves.next().unwrap_or_default();
            right = waves.next().unwrap_or_default();
            debug!("Resampled to {}Hz: {} frames", target_rate, left.len());
        }

        let frames: Vec<StereoSample> = left
            .into_iter()
            .zip(right)
            .map(|(l, r)| StereoSample::new(l, r))
            .collect();
        if frames.is_empty() {
            return Err(MediaError::Empty);
        }

        let rate = if target_rate > 0 { target_rate } else { spec.sample_rate };
        Ok(Self::from_frames(frames, rate))
    }

    pub fn id(&self) -> MediaId {
        self.id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len_frames(&self) -> usize {
        self.frames.len()
    }

    /// Native playback: copy the next frames into `out` while playing,
    /// silence otherwise. Reaching the end pauses and flags `ended`.
    pub fn read_frames(&mut self, out: &mut [StereoSample]) {
        if !self.playing {
            out.fill(StereoSample::silence());
            return;
        }

        let available = self.frames.len().saturating_sub(self.cursor);
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.frames[self.cursor..self.cursor + n]);
        out[n..].fill(StereoSample::silence());
        self.cursor += n;

        if self.cursor >= self.frames.len() {
            self.playing = false;
            self.ended = true;
        }
    }

    /// Natural end of media, reported once.
    pub fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended)
    }
}

impl PlaybackClock for MediaElement {
    fn current_time(&self) -> f64 {
        self.cursor as f64 / f64::from(self.sample_rate)
    }

    fn duration(&self) -> f64 {
        self.frames.len() as f64 / f64::from(self.sample_rate)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl Transport for MediaElement {
    fn play(&mut self) {
        if self.cursor >= self.frames.len() {
            self.cursor = 0;
        }
        self.playing = !self.frames.is_empty();
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        let frame = (seconds * f64::from(self.sample_rate)).round() as usize;
        self.cursor = frame.min(self.frames.len());
        self.ended = false;
    }
}

fn resample(waves: Vec<Vec<f32>>, from: u32, to: u32) -> Result<Vec<Vec<f32>>, MediaError> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk = waves.first().map_or(0, Vec::len);
    let mut resampler = SincFixedIn::<f32>::new(
        f64::from(to) / f64::from(from),
        2.0,
        params,
        chunk,
        waves.len(),
    )
    .map_err(|e| MediaError::Resample(e.to_string()))?;
    resampler
        .process(&waves, None)
        .map_err(|e| MediaError::Resample(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<StereoSample> {
        (0..n).map(|i| StereoSample::mono(i as f32)).collect()
    }

    #[test]
    fn paused_media_renders_silence_and_holds_position() {
        let mut media = MediaElement::from_frames(ramp(8), 4);
        let mut out = [StereoSample::mono(7.0); 4];
        media.read_frames(&mut out);
        assert!(out.iter().all(|f| *f == StereoSample::silence()));
        assert_eq!(media.current_time(), 0.0);
    }

    #[test]
    fn playback_advances_clock_and_ends_once() {
        let mut media = MediaElement::from_frames(ramp(6), 4);
        media.play();

        let mut out = [StereoSample::silence(); 4];
        media.read_frames(&mut out);
        assert_eq!(media.current_time(), 1.0);
        assert_eq!(out[3], StereoSample::mono(3.0));

        media.read_frames(&mut out);
        assert_eq!(out[1], StereoSample::mono(5.0));
        assert_eq!(out[2], StereoSample::silence());
        assert!(!media.is_playing());
        assert!(media.take_ended());
        assert!(!media.take_ended());
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut media = MediaElement::from_frames(ramp(10), 10);
        media.seek(5.0);
        assert_eq!(media.current_time(), 1.0);
        media.seek(-3.0);
        assert_eq!(media.current_time(), 0.0);
        media.seek(f64::NAN);
        assert_eq!(media.current_time(), 0.0);
    }

    #[test]
    fn play_after_end_restarts() {
        let mut media = MediaElement::from_frames(ramp(2), 2);
        media.play();
        let mut out = [StereoSample::silence(); 2];
        media.read_frames(&mut out);
        assert!(!media.is_playing());
        media.play();
        assert_eq!(media.current_time(), 0.0);
        assert!(media.is_playing());
    }
}
