use std::path::PathBuf;

use funtime::audio::frame::StereoSample;
use funtime::audio::media::MediaElement;
use funtime::kernel::event::{Event, InputContent, TranscriptionOutcome};
use funtime::kernel::reactor::{Reactor, ReactorConfig};
use funtime::kernel::telemetry::event::TelemetryEvent;
use funtime::lyrics::segment::{TranscriptSegment, TranscriptionResult};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_mode_switches_are_counted() {
    let (_tx, rx) = mpsc::channel(100);
    let mut reactor = Reactor::new(rx, ReactorConfig::default());
    let media = MediaElement::from_frames(vec![StereoSample::mono(0.2); 500], 100);
    reactor.tick_step(vec![InputContent::LoadAudio { media, path: PathBuf::from("a.wav") }.into()]);

    for _ in 0..4 {
        reactor.tick_step(vec![InputContent::ToggleMode.into()]);
    }
    let snapshot = reactor.telemetry.snapshot();
    assert_eq!(snapshot.routing.switches, 4);
    assert_eq!(snapshot.routing.karaoke_entries, 2);
    assert_eq!(snapshot.uploads.started, 1);
}

#[tokio::test]
async fn test_segment_transitions_and_summary() {
    let (_tx, rx) = mpsc::channel(100);
    let mut reactor = Reactor::new(rx, ReactorConfig::default());
    let media = MediaElement::from_frames(vec![StereoSample::mono(0.2); 500], 100);
    reactor.tick_step(vec![InputContent::LoadAudio { media, path: PathBuf::from("a.wav") }.into()]);
    let upload = reactor.uploads.current().unwrap();

    let result = TranscriptionResult {
        segments: vec![
            TranscriptSegment::new("one", 0.0, 1.0),
            TranscriptSegment::new("two", 1.0, 2.0),
            TranscriptSegment::new("bad", 2.0, 2.0),
        ],
        words: vec![],
    };
    reactor.tick_step(vec![Event::Transcription { upload, outcome: TranscriptionOutcome::Completed(result) }]);
    reactor.tick_step(vec![InputContent::Seek(1.5).into()]);

    let snapshot = reactor.telemetry.snapshot();
    assert_eq!(snapshot.lyrics.transitions, 2);
    assert_eq!(snapshot.lyrics.segments_loaded, 2);
    assert_eq!(snapshot.lyrics.segments_rejected, 1);

    match reactor.telemetry.aggregate_session(reactor.tick.frame) {
        TelemetryEvent::SessionSummary { duration_ticks, segment_transitions, .. } => {
            assert_eq!(duration_ticks, 3);
            assert_eq!(segment_transitions, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
}
