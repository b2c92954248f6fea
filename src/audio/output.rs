use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use thiserror::Error;
use tracing::{error, info};

use super::frame::{write_interleaved, StereoSample};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("no output device available")]
    NoDevice,
    #[error("output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("unsupported output sample format {0:?}")]
    Format(cpal::SampleFormat),
}

/// Default output device fed from a ring buffer of interleaved f32 samples.
pub struct DeviceOutput {
    _stream: cpal::Stream,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DeviceOutput {
    /// Open the default device with a ring holding `latency_ms` of audio at
    /// the device's own rate and channel count. Returns the feeding side.
    pub fn open(latency_ms: u64) -> Result<(Self, HeapProd<f32>), OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;

        info!("Audio Output Device: {}", device.name().unwrap_or_default());

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        info!("Audio Output Config: Rate={}Hz, Channels={}", sample_rate, channels);

        let (producer, mut consumer) = output_ring(ring_capacity(sample_rate, channels, latency_ms));

        let err_fn = |err| error!("an error occurred on output stream: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &_| read_output_data(data, &mut consumer),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config.into(),
                move |data: &mut [i16], _: &_| read_output_data_i16(data, &mut consumer),
                err_fn,
                None,
            )?,
            other => return Err(OutputError::Format(other)),
        };

        stream.play()?;

        let output = Self {
            _stream: stream,
            sample_rate,
            channels,
        };
        Ok((output, producer))
    }
}

fn read_output_data<C>(output: &mut [f32], consumer: &mut C)
where
    C: Consumer<Item = f32>,
{
    // Underrun plays silence
    let n = consumer.pop_slice(output);
    output[n..].fill(0.0);
}

fn read_output_data_i16<C>(output: &mut [i16], consumer: &mut C)
where
    C: Consumer<Item = f32>,
{
    for slot in output.iter_mut() {
        let sample = consumer.try_pop().unwrap_or(0.0);
        *slot = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    }
}

/// Interleaved samples needed to queue `latency_ms` of audio.
pub fn ring_capacity(sample_rate: u32, channels: u16, latency_ms: u64) -> usize {
    let frames = u64::from(sample_rate) * latency_ms / 1000;
    (frames as usize * usize::from(channels.max(1))).max(1)
}

pub fn output_ring(capacity: usize) -> (HeapProd<f32>, HeapCons<f32>) {
    HeapRb::<f32>::new(capacity.max(1)).split()
}

/// Keeps the device ring buffer topped up from a render callback.
pub struct OutputPump {
    producer: HeapProd<f32>,
    channels: usize,
    block: Vec<StereoSample>,
    interleaved: Vec<f32>,
}

impl OutputPump {
    pub fn new(producer: HeapProd<f32>, channels: u16, block_frames: usize) -> Self {
        let channels = usize::from(channels.max(1));
        Self {
            producer,
            channels,
            block: vec![StereoSample::silence(); block_frames.max(1)],
            interleaved: vec![0.0; block_frames.max(1) * channels],
        }
    }

    /// Render as many whole blocks as fit. Returns frames rendered.
    pub fn pump<F>(&mut self, mut render: F) -> usize
    where
        F: FnMut(&mut [StereoSample]),
    {
        let block_samples = self.block.len() * self.channels;
        let mut frames = 0;
        while self.producer.vacant_len() >= block_samples {
            render(&mut self.block);
            let written = write_interleaved(&self.block, &mut self.interleaved, self.channels);
            self.producer.push_slice(&self.interleaved[..written]);
            frames += self.block.len();
        }
        frames
    }

    /// Frames rendered but not yet taken by the device.
    pub fn queued_frames(&self) -> usize {
        self.producer.occupied_len() / self.channels
    }
}

/// Paces rendering from wall time when there is no device pulling frames.
#[derive(Debug)]
pub struct HeadlessClock {
    sample_rate: u32,
    origin: Instant,
    rendered: u64,
}

impl HeadlessClock {
    pub fn new(sample_rate: u32, now: Instant) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            origin: now,
            rendered: 0,
        }
    }

    /// Frames that should have played since the previous call, skipped
    /// ticks included.
    pub fn frames_due(&mut self, now: Instant) -> usize {
        let nanos = now.saturating_duration_since(self.origin).as_nanos();
        let target = (nanos * u128::from(self.sample_rate) / 1_000_000_000) as u64;
        let due = target.saturating_sub(self.rendered);
        self.rendered = self.rendered.max(target);
        due as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pump_fills_whole_blocks_only() {
        let (producer, mut consumer) = output_ring(10);
        let mut pump = OutputPump::new(producer, 2, 2);

        let mut calls = 0;
        let frames = pump.pump(|block| {
            calls += 1;
            block.fill(StereoSample::new(0.25, -0.25));
        });

        // 10 slots hold two 4-sample blocks
        assert_eq!(calls, 2);
        assert_eq!(frames, 4);
        assert_eq!(consumer.occupied_len(), 8);

        let mut out = [0.0_f32; 12];
        read_output_data(&mut out, &mut consumer);
        assert_eq!(&out[..2], &[0.25, -0.25]);
        assert!(out[8..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn ring_capacity_follows_device_layout() {
        assert_eq!(ring_capacity(48_000, 2, 48), 4_608);
        assert_eq!(ring_capacity(48_000, 1, 48), 2_304);
        assert_eq!(ring_capacity(44_100, 6, 10), 2_646);
    }

    #[test]
    fn queued_frames_counts_whole_frames() {
        let (producer, mut consumer) = output_ring(12);
        let mut pump = OutputPump::new(producer, 2, 3);
        pump.pump(|block| block.fill(StereoSample::mono(0.1)));
        assert_eq!(pump.queued_frames(), 6);

        let mut out = [0.0_f32; 4];
        read_output_data(&mut out, &mut consumer);
        assert_eq!(pump.queued_frames(), 4);
    }

    #[test]
    fn headless_clock_catches_up_after_skipped_ticks() {
        let start = Instant::now();
        let mut clock = HeadlessClock::new(1_000, start);
        assert_eq!(clock.frames_due(start + Duration::from_millis(16)), 16);
        // Three ticks late: all of it is rendered at once
        assert_eq!(clock.frames_due(start + Duration::from_millis(64)), 48);
        assert_eq!(clock.frames_due(start + Duration::from_micros(64_500)), 0);
        assert_eq!(clock.frames_due(start + Duration::from_micros(65_000)), 1);
    }
}
