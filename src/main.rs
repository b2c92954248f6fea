use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use funtime::audio::capture::Recorder;
use funtime::audio::frame::StereoSample;
use funtime::audio::media::MediaElement;
use funtime::audio::output::{DeviceOutput, HeadlessClock, OutputPump};
use funtime::config::StudioConfig;
use funtime::error::StudioError;
use funtime::kernel::cancel::UploadId;
use funtime::kernel::event::{Event, InputContent, TranscriptionOutcome};
use funtime::kernel::reactor::Reactor;
use funtime::kernel::scheduler::SideEffect;
use funtime::kernel::time::TICK_MS;
use funtime::services::transcription::{load_transcript_file, TranscriptionError, TranscriptionService};

// Internal Driver Commands (Never touch Kernel)
enum DriverCommand {
    Kernel(InputContent),
    ToggleRecording,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let config = StudioConfig::parse();
    tracing::info!("FunTime Studio Booting...");

    // Output device; headless when none can be opened
    let (device, mut pump) = match DeviceOutput::open(TICK_MS * 3) {
        Ok((device, producer)) => {
            let block = (device.sample_rate as u64 * TICK_MS / 1000) as usize;
            let pump = OutputPump::new(producer, device.channels, block / 2);
            (Some(device), Some(pump))
        }
        Err(e) => {
            tracing::warn!("No audio output ({}); running headless", e);
            (None, None)
        }
    };
    let sample_rate = device.as_ref().map_or(config.sample_rate, |d| d.sample_rate);

    let media = MediaElement::open_wav(&config.audio, sample_rate)
        .with_context(|| format!("loading {}", config.audio.display()))?;

    // Kernel Channel
    let (tx, rx) = mpsc::channel(100);
    let mut reactor = Reactor::new(rx, config.reactor());

    // Driver Internal Channel
    let (driver_tx, mut driver_rx) = mpsc::channel(16);
    tokio::spawn(read_commands(driver_tx));

    let service = TranscriptionService::new(
        config.transcription_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        Duration::from_secs(config.timeout_secs),
    );

    // Driver State
    let mut transcriptions: HashMap<UploadId, CancellationToken> = HashMap::new();
    let mut recorder: Option<Recorder> = None;
    let mut headless = HeadlessClock::new(sample_rate, Instant::now());
    let mut headless_block: Vec<StereoSample> = Vec::new();

    if config.record_on_start() {
        start_recording(config.recording_path(), &mut recorder);
    }

    tx.send(InputContent::LoadAudio { media, path: config.audio.clone() }.into())
        .await
        .context("kernel channel closed")?;
    tx.send(InputContent::Play.into()).await.context("kernel channel closed")?;

    let mut cadence = tokio::time::interval(Duration::from_millis(TICK_MS));
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    println!("Commands: k=karaoke  p=play/pause  s <sec>=seek  v <0-1>=volume  r=record  q=quit");

    loop {
        cadence.tick().await;

        // 1. Drain Kernel Events
        let mut events = reactor.drain_pending();

        // 2. Drain Driver Commands
        while let Ok(command) = driver_rx.try_recv() {
            match command {
                DriverCommand::Kernel(content) => events.push(content.into()),
                DriverCommand::ToggleRecording => match recorder.take() {
                    Some(active) => match active.stop() {
                        Ok(path) => events.push(InputContent::RecordingSaved(path).into()),
                        Err(e) => report(StudioError::from(e)),
                    },
                    None => start_recording(config.recording_path(), &mut recorder),
                },
                DriverCommand::Quit => events.push(InputContent::Unmount.into()),
            }
        }

        // Lyrics follow what the device has played, not what was rendered
        if let Some(pump) = pump.as_ref() {
            reactor.set_playback_latency(pump.queued_frames() as f64 / f64::from(sample_rate));
        }

        // 3. Kernel Step
        let effects = reactor.tick_step(events);

        // 4. Handle Side Effects
        for effect in effects {
            match effect {
                SideEffect::Log(msg) => tracing::info!("[LOG] {}", msg),

                SideEffect::ScrollToSegment { index, text } => println!("[{:>3}] {}", index, text),

                SideEffect::RequestTranscription { upload, path } => {
                    let token = CancellationToken::new();
                    transcriptions.insert(upload, token.clone());

                    let service = service.clone();
                    let transcript = config.transcript.clone();
                    let kernel_tx = tx.clone();

                    tokio::spawn(async move {
                        let result = match transcript {
                            Some(file) => load_transcript_file(&file).await,
                            None => service.transcribe(&path, token).await,
                        };
                        let outcome = match result {
                            Ok(result) => TranscriptionOutcome::Completed(result),
                            Err(TranscriptionError::Cancelled) => return,
                            Err(e) => TranscriptionOutcome::Failed(e.to_string()),
                        };
                        let _ = kernel_tx.send(Event::Transcription { upload, outcome }).await;
                    });
                }

                SideEffect::CancelTranscription(upload) => {
                    if let Some(token) = transcriptions.remove(&upload) {
                        token.cancel();
                    }
                }

                SideEffect::Notify(progress) => tracing::info!("Progress event: {:?}", progress),

                SideEffect::FeatureUnavailable(feature) => {
                    println!("{} is unavailable on this device", feature)
                }
            }
        }

        if reactor.state.released {
            break;
        }

        // 5. Feed the device (or advance the clock without one)
        match pump.as_mut() {
            Some(pump) => {
                pump.pump(|block| reactor.render(block));
            }
            None => {
                headless_block.resize(headless.frames_due(Instant::now()), StereoSample::silence());
                reactor.render(&mut headless_block);
            }
        }
    }

    if let Some(active) = recorder.take() {
        if let Err(e) = active.stop() {
            report(StudioError::from(e));
        }
    }
    for (_, token) in transcriptions.drain() {
        token.cancel();
    }

    let summary = reactor.telemetry.aggregate_session(reactor.tick.frame);
    tracing::info!("Session: {:?}", summary);
    drop(device);
    Ok(())
}

fn start_recording(path: PathBuf, recorder: &mut Option<Recorder>) {
    match Recorder::start(path) {
        Ok(started) => {
            println!("Recording to {}", started.path().display());
            *recorder = Some(started);
        }
        Err(e) => report(StudioError::from(e)),
    }
}

fn report(error: StudioError) {
    match error.user_message() {
        Some(message) => println!("{}", message),
        None => tracing::debug!("{}", error),
    }
}

async fn read_commands(driver_tx: mpsc::Sender<DriverCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let command = match (parts.next(), parts.next()) {
            (Some("k"), _) => DriverCommand::Kernel(InputContent::ToggleMode),
            (Some("p"), _) => DriverCommand::Kernel(InputContent::TogglePlayback),
            (Some("s"), Some(arg)) => match arg.parse::<f64>() {
                Ok(seconds) => DriverCommand::Kernel(InputContent::Seek(seconds)),
                Err(_) => continue,
            },
            (Some("v"), Some(arg)) => match arg.parse::<f32>() {
                Ok(volume) => DriverCommand::Kernel(InputContent::SetVolume(volume)),
                Err(_) => continue,
            },
            (Some("r"), _) => DriverCommand::ToggleRecording,
            (Some("q"), _) => DriverCommand::Quit,
            _ => continue,
        };
        let quit = matches!(command, DriverCommand::Quit);
        if driver_tx.send(command).await.is_err() || quit {
            break;
        }
    }
}
