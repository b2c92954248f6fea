use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cancel::{UploadId, UploadRegistry};
use super::event::{Event, InputContent, InputEvent, ProgressEvent, TranscriptionOutcome};
use super::scheduler::{Scheduler, SideEffect};
use super::state::{StateDelta, StudioState};
use super::telemetry::event::{LifecycleEvent, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::Tick;

use crate::audio::frame::StereoSample;
use crate::audio::graph::{ContextFactory, SoftwareContext};
use crate::audio::media::{MediaElement, PlaybackClock, Transport};
use crate::audio::router::{AudioRouter, ModeChange, RoutingMode};
use crate::error::StudioError;
use crate::lyrics::segment::Transcript;
use crate::lyrics::tracker::LyricsTracker;

#[derive(Debug, Clone, Copy)]
pub struct ReactorConfig {
    pub start_mode: RoutingMode,
    pub volume: f32,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            start_mode: RoutingMode::Normal,
            volume: 1.0,
        }
    }
}

pub struct Reactor {
    pub receiver: mpsc::Receiver<Event>,
    pub state: StudioState,
    pub scheduler: Scheduler,
    pub uploads: UploadRegistry,
    pub telemetry: TelemetryRecorder,
    pub tick: Tick,

    router: AudioRouter,
    tracker: LyricsTracker,
    media: Option<MediaElement>,
    factory: Box<dyn ContextFactory + Send>,
    // Mode the user asked for; reapplied whenever new audio is attached
    preferred_mode: RoutingMode,
    // Seconds of rendered audio the device has not played yet
    playback_latency: f64,
}

impl Reactor {
    pub fn new(receiver: mpsc::Receiver<Event>, config: ReactorConfig) -> Self {
        Self::with_factory(receiver, config, Box::new(SoftwareContext))
    }

    pub fn with_factory(
        receiver: mpsc::Receiver<Event>,
        config: ReactorConfig,
        factory: Box<dyn ContextFactory + Send>,
    ) -> Self {
        let router = AudioRouter::with_volume(config.volume);
        let mut state = StudioState::new();
        state.reduce(StateDelta::VolumeChanged(router.volume()));

        Self {
            receiver,
            state,
            scheduler: Scheduler,
            uploads: UploadRegistry::new(),
            telemetry: TelemetryRecorder::new(),
            tick: Tick::new(),
            router,
            tracker: LyricsTracker::default(),
            media: None,
            factory,
            preferred_mode: config.start_mode,
            playback_latency: 0.0,
        }
    }

    /// Pure Tick Step: Advances State. Returns SideEffects to be executed by the driver.
    /// MUST NOT await I/O or timers.
    ///
    /// Events apply in arrival order. The lyrics tracker runs last, against
    /// the clock as it stands after every transport change of this tick.
    pub fn tick_step(&mut self, events: Vec<Event>) -> Vec<SideEffect> {
        self.tick = self.tick.next();
        self.state.reduce(StateDelta::Tick(self.tick)); // Sync Time
        let mut effects = Vec::new();

        for event in events {
            match event {
                Event::Input(input) => self.apply_input(input, &mut effects),
                Event::Transcription { upload, outcome } => {
                    self.apply_transcription(upload, outcome, &mut effects)
                }
            }
        }

        self.observe_playback(&mut effects);
        effects
    }

    /// Pull the next block through the current routing path. Silence when
    /// nothing is loaded.
    pub fn render(&mut self, out: &mut [StereoSample]) {
        match self.media.as_mut() {
            Some(media) => self.router.render(media, out),
            None => out.fill(StereoSample::silence()),
        }
    }

    /// Audio queued ahead of the device. While playing, lyrics follow the
    /// media clock minus this, so they track what is heard.
    pub fn set_playback_latency(&mut self, seconds: f64) {
        self.playback_latency = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    }

    pub fn drain_pending(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn router(&self) -> &AudioRouter {
        &self.router
    }

    pub fn tracker(&self) -> &LyricsTracker {
        &self.tracker
    }

    pub fn media(&self) -> Option<&MediaElement> {
        self.media.as_ref()
    }

    pub fn preferred_mode(&self) -> RoutingMode {
        self.preferred_mode
    }

    fn apply_input(&mut self, input: InputEvent, effects: &mut Vec<SideEffect>) {
        debug!("Input from {}: {:?}", input.source, input.content);

        match input.content {
            InputContent::LoadAudio { media, path } => {
                self.load_audio(media, effects);
                if let Some(upload) = self.uploads.current() {
                    effects.push(SideEffect::RequestTranscription { upload, path });
                }
            }
            InputContent::Play => self.with_media(effects, |m| m.play()),
            InputContent::Pause => self.with_media(effects, |m| m.pause()),
            InputContent::TogglePlayback => self.with_media(effects, |m| {
                if m.is_playing() {
                    m.pause()
                } else {
                    m.play()
                }
            }),
            InputContent::Seek(seconds) => self.with_media(effects, |m| m.seek(seconds)),
            InputContent::SetMode(mode) => self.request_mode(mode, effects),
            InputContent::ToggleMode => {
                let target = if self.router.is_attached() {
                    self.router.mode().toggled()
                } else {
                    self.preferred_mode.toggled()
                };
                self.request_mode(target, effects);
            }
            InputContent::SetVolume(volume) => {
                self.router.set_volume(volume);
                self.state.reduce(StateDelta::VolumeChanged(self.router.volume()));
            }
            InputContent::RecordingSaved(path) => {
                info!("Recording saved to {}", path.display());
                self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::RecordingMade));
                effects.push(SideEffect::Notify(ProgressEvent::RecordingMade));
            }
            InputContent::Unmount => self.unmount(effects),
        }
    }

    /// Router, transcript and upload id change together.
    fn load_audio(&mut self, media: MediaElement, effects: &mut Vec<SideEffect>) {
        let (upload, previous) = self.uploads.begin();
        if let Some(previous) = previous {
            effects.push(SideEffect::CancelTranscription(previous));
        }

        self.router.release();
        let mut router = AudioRouter::with_volume(self.state.volume);
        if let Err(e) = router.attach(&media, self.factory.as_ref()) {
            match StudioError::from_routing(&e) {
                Some(err) if err.is_silent() => debug!("Attach degraded: {}", err),
                _ => warn!("Attach failed: {}", e),
            }
            self.telemetry.record(TelemetryEvent::PlatformDegraded);
        }
        self.router = router;
        self.tracker.clear();
        self.media = Some(media);

        self.state.reduce(StateDelta::UploadStarted(upload));
        self.state.reduce(StateDelta::Degraded(self.router.is_degraded()));
        self.state.reduce(StateDelta::ModeChanged(self.router.mode()));
        self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::UploadStarted));
        info!("Upload {:?} started", upload);

        if self.preferred_mode != self.router.mode() {
            self.switch_mode(self.preferred_mode, effects);
        }
    }

    fn request_mode(&mut self, mode: RoutingMode, effects: &mut Vec<SideEffect>) {
        if self.media.is_none() && !self.state.released {
            // Nothing to route yet: remember it for the next upload
            self.preferred_mode = mode;
            return;
        }
        self.preferred_mode = mode;
        self.switch_mode(mode, effects);
    }

    fn switch_mode(&mut self, mode: RoutingMode, effects: &mut Vec<SideEffect>) {
        match self.router.set_mode(mode) {
            Ok(ModeChange::Unchanged) => {}
            Ok(ModeChange::Switched { from, to }) => {
                self.state.reduce(StateDelta::ModeChanged(to));
                self.telemetry.record(TelemetryEvent::ModeSwitched { from, to, tick: self.tick });
            }
            Ok(ModeChange::Unavailable) => {
                self.telemetry.record(TelemetryEvent::ModeUnavailable { tick: self.tick });
                effects.push(SideEffect::FeatureUnavailable("karaoke"));
            }
            Err(e) => {
                warn!("Mode switch to {:?} failed: {}", mode, e);
                effects.push(SideEffect::Log(format!("mode switch failed: {}", e)));
            }
        }
    }

    fn unmount(&mut self, effects: &mut Vec<SideEffect>) {
        if let Some(upload) = self.uploads.clear() {
            effects.push(SideEffect::CancelTranscription(upload));
        }
        self.router.release();
        self.tracker.clear();
        self.media = None;
        self.state.reduce(StateDelta::Released);
        self.state.reduce(StateDelta::ModeChanged(self.router.mode()));
        self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::Released));
    }

    fn with_media<F>(&mut self, effects: &mut Vec<SideEffect>, f: F)
    where
        F: FnOnce(&mut MediaElement),
    {
        match self.media.as_mut() {
            Some(media) => f(media),
            None => effects.push(SideEffect::Log("no audio loaded".to_string())),
        }
    }

    fn apply_transcription(
        &mut self,
        upload: UploadId,
        outcome: TranscriptionOutcome,
        effects: &mut Vec<SideEffect>,
    ) {
        if self.uploads.check(upload).is_err() {
            self.telemetry.record(TelemetryEvent::StaleResultDiscarded { upload });
            return;
        }

        match outcome {
            TranscriptionOutcome::Completed(result) => {
                let (transcript, rejected) = Transcript::from_result(result);
                if !rejected.is_empty() {
                    warn!("Dropped {} malformed segments", rejected.len());
                }
                let segments = transcript.len();
                info!("Transcript ready: {} segments", segments);

                self.state.reduce(StateDelta::TranscriptApplied {
                    segments,
                    rejected: rejected.len(),
                });
                self.telemetry.record(TelemetryEvent::TranscriptLoaded {
                    segments,
                    rejected: rejected.len(),
                });
                if transcript.is_empty() {
                    effects.push(SideEffect::Log(StudioError::EmptyTranscript.to_string()));
                }
                self.tracker.replace(transcript);
            }
            TranscriptionOutcome::Failed(reason) => {
                warn!("Transcription failed: {}", reason);
                self.tracker.clear();
                self.state.reduce(StateDelta::TranscriptUnavailable);
                self.telemetry.record(TelemetryEvent::TranscriptionFailed);
            }
        }
    }

    fn observe_playback(&mut self, effects: &mut Vec<SideEffect>) {
        let Some(media) = self.media.as_mut() else {
            return;
        };

        if media.take_ended() {
            self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::SongPlayed));
            effects.push(SideEffect::Notify(ProgressEvent::SongPlayed));
        }

        let playing = media.is_playing();
        let current_time = if playing {
            (media.current_time() - self.playback_latency).max(0.0)
        } else {
            media.current_time()
        };
        self.state.reduce(StateDelta::Playback {
            playing,
            current_time,
            duration: media.duration(),
        });

        let before = self.tracker.last_active();
        let update = self.tracker.update(current_time);
        let after = self.tracker.last_active();
        if before != after {
            self.telemetry.record(TelemetryEvent::SegmentTransition {
                from: before,
                to: after,
                tick: self.tick,
            });
        }

        let (delta, effect) = self.scheduler.lyrics(&update, self.tracker.transcript());
        if let Some(delta) = delta {
            self.state.reduce(delta);
        }
        if let Some(effect) = effect {
            effects.push(effect);
        }
    }
}
