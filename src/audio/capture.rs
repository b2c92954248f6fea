//! Microphone recording for the karaoke studio.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum CaptureError {
    /// No usable input device. Shown to the user; the studio keeps running.
    #[error("no microphone available: {0}")]
    MicrophoneUnavailable(String),
    #[error("recording stream failed: {0}")]
    Stream(String),
    #[error("wav write failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("recording writer thread panicked")]
    WriterPanicked,
}

/// Mono 16-bit WAV writer fed with interleaved input chunks.
pub struct WavSink {
    writer: hound::WavWriter<BufWriter<File>>,
    channels: usize,
    frames: u64,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32, input_channels: u16) -> Result<Self, CaptureError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        Ok(Self {
            writer: hound::WavWriter::create(path, spec)?,
            channels: usize::from(input_channels.max(1)),
            frames: 0,
        })
    }

    /// Append interleaved samples, downmixed to mono. A trailing partial
    /// frame is dropped.
    pub fn write_interleaved(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        for frame in samples.chunks_exact(self.channels) {
            let mono = frame.iter().sum::<f32>() / self.channels as f32;
            self.writer.write_sample((mono.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
            self.frames += 1;
        }
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finalize(self) -> Result<u64, CaptureError> {
        let frames = self.frames;
        self.writer.finalize()?;
        Ok(frames)
    }
}

/// An in-progress microphone recording.
pub struct Recorder {
    stream: Option<cpal::Stream>,
    writer: Option<JoinHandle<Result<u64, CaptureError>>>,
    stop: Arc<AtomicBool>,
    path: PathBuf,
}

impl Recorder {
    pub fn start<P: Into<PathBuf>>(path: P) -> Result<Self, CaptureError> {
        let path = path.into();
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::MicrophoneUnavailable("No input device available".to_string()))?;

        info!("Audio Input Device: {}", device.name().unwrap_or_default());

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::MicrophoneUnavailable(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        info!("Recording Config: Rate={}Hz, Channels={}", sample_rate, channels);

        // Two seconds of slack between the device thread and the writer
        let capacity = (sample_rate as usize * usize::from(channels) * 2).max(1);
        let (mut producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let err_fn = |err| error!("an error occurred on input stream: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| {
                    // If the writer falls behind we drop input (lossy)
                    producer.push_slice(data);
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| {
                    for &sample in data {
                        let _ = producer.try_push(sample as f32 / i16::MAX as f32);
                    }
                },
                err_fn,
                None,
            ),
            other => {
                return Err(CaptureError::MicrophoneUnavailable(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| CaptureError::MicrophoneUnavailable(e.to_string()))?;

        let sink = WavSink::create(&path, sample_rate, channels)?;
        let stop = Arc::new(AtomicBool::new(false));
        let writer = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || drain(consumer, sink, &stop))
        };

        // Dropping this on a failed play stops the writer thread
        let recorder = Self {
            stream: Some(stream),
            writer: Some(writer),
            stop,
            path,
        };
        if let Some(stream) = &recorder.stream {
            stream.play().map_err(|e| CaptureError::Stream(e.to_string()))?;
        }
        info!("Recording to {}", recorder.path.display());
        Ok(recorder)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the device, flush what is queued and finalize the file.
    pub fn stop(mut self) -> Result<PathBuf, CaptureError> {
        self.finish()?;
        Ok(std::mem::take(&mut self.path))
    }

    fn finish(&mut self) -> Result<(), CaptureError> {
        drop(self.stream.take());
        self.stop.store(true, Ordering::Release);
        if let Some(writer) = self.writer.take() {
            let frames = writer.join().map_err(|_| CaptureError::WriterPanicked)??;
            info!("Recording finished: {} frames -> {}", frames, self.path.display());
        }
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            error!("Recording teardown failed: {}", e);
        }
    }
}

fn drain(mut consumer: HeapCons<f32>, mut sink: WavSink, stop: &AtomicBool) -> Result<u64, CaptureError> {
    let channels = sink.channels;
    let mut chunk = vec![0.0_f32; 4096 * channels];
    loop {
        let stopping = stop.load(Ordering::Acquire);
        // Whole frames only, so channels never shift
        let ready = (consumer.occupied_len().min(chunk.len()) / channels) * channels;
        if ready == 0 {
            if stopping {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }
        let n = consumer.pop_slice(&mut chunk[..ready]);
        sink.write_interleaved(&chunk[..n])?;
    }
    debug!("Recording writer drained {} frames", sink.frames());
    sink.finalize()
}
