use funtime::audio::frame::StereoSample;
use funtime::audio::graph::{SoftwareContext, UnavailableContext};
use funtime::audio::media::{MediaElement, Transport};
use funtime::audio::error::RoutingError;
use funtime::{AudioRouter, ModeChange, RoutingMode};

fn song() -> MediaElement {
    // Centre vocal 0.4, guitar hard left 0.3
    let frames = vec![StereoSample::new(0.7, 0.4); 4_800];
    let mut media = MediaElement::from_frames(frames, 48_000);
    media.play();
    media
}

fn render_block(router: &mut AudioRouter, media: &mut MediaElement) -> Vec<StereoSample> {
    let mut out = vec![StereoSample::silence(); 64];
    router.render(media, &mut out);
    out
}

#[test]
fn test_repeated_set_mode_is_idempotent() {
    let mut media = song();
    let mut router = AudioRouter::new();
    router.attach(&media, &SoftwareContext).unwrap();

    assert!(matches!(router.set_mode(RoutingMode::Karaoke), Ok(ModeChange::Switched { .. })));
    let nodes = router.live_nodes();
    for _ in 0..5 {
        assert_eq!(router.set_mode(RoutingMode::Karaoke), Ok(ModeChange::Unchanged));
    }
    assert_eq!(router.live_nodes(), nodes, "No extra nodes built");
    assert_eq!(router.output_paths(), 1);

    let out = render_block(&mut router, &mut media);
    assert!((out[0].left - 0.3).abs() < 1e-5, "Single karaoke path, not doubled");
}

#[test]
fn test_round_trip_matches_fresh_normal_path() {
    let mut fresh_media = song();
    let mut fresh = AudioRouter::with_volume(0.6);
    fresh.attach(&fresh_media, &SoftwareContext).unwrap();
    let expected = render_block(&mut fresh, &mut fresh_media);

    let mut media = song();
    let mut router = AudioRouter::with_volume(0.6);
    router.attach(&media, &SoftwareContext).unwrap();
    let normal_nodes = router.live_nodes();
    router.set_mode(RoutingMode::Karaoke).unwrap();
    router.set_mode(RoutingMode::Normal).unwrap();

    assert_eq!(router.live_nodes(), normal_nodes, "Karaoke chain fully torn down");
    assert_eq!(render_block(&mut router, &mut media), expected);
}

#[test]
fn test_rapid_toggling_keeps_single_path() {
    let mut media = song();
    let mut router = AudioRouter::new();
    router.attach(&media, &SoftwareContext).unwrap();
    let normal_nodes = router.live_nodes();

    // Several seconds of toggling once per 60 Hz frame
    for frame in 0..600 {
        let target = router.mode().toggled();
        router.set_mode(target).unwrap();
        assert_eq!(router.output_paths(), 1, "frame {}", frame);
        assert!(router.live_nodes() <= normal_nodes + 3);
        render_block(&mut router, &mut media);
    }
    assert_eq!(router.mode(), RoutingMode::Normal);
    assert_eq!(router.live_nodes(), normal_nodes);
}

#[test]
fn test_volume_survives_mode_switch() {
    let mut media = song();
    let mut router = AudioRouter::new();
    router.attach(&media, &SoftwareContext).unwrap();
    router.set_volume(0.5);
    router.set_mode(RoutingMode::Karaoke).unwrap();
    assert_eq!(router.volume(), 0.5);

    let out = render_block(&mut router, &mut media);
    assert!((out[0].left - 0.15).abs() < 1e-5);
    assert!((out[0].right - 0.15).abs() < 1e-5);
}

#[test]
fn test_release_is_idempotent() {
    let mut media = song();
    let mut router = AudioRouter::new();
    router.attach(&media, &SoftwareContext).unwrap();
    router.set_mode(RoutingMode::Karaoke).unwrap();

    router.release();
    router.release();
    assert_eq!(router.live_nodes(), 0);
    assert_eq!(router.output_paths(), 0);
    assert!(!router.is_attached());
    assert_eq!(router.set_mode(RoutingMode::Karaoke), Ok(ModeChange::Unavailable));
    assert!(render_block(&mut router, &mut media).iter().all(|f| *f == StereoSample::silence()));
}

#[test]
fn test_unsupported_platform_plays_natively() {
    let mut media = song();
    let mut router = AudioRouter::new();
    assert_eq!(router.attach(&media, &UnavailableContext), Err(RoutingError::UnsupportedPlatform));

    assert!(router.is_degraded());
    assert_eq!(router.output_paths(), 1);
    assert_eq!(router.set_mode(RoutingMode::Normal), Ok(ModeChange::Unchanged));
    assert_eq!(router.set_mode(RoutingMode::Karaoke), Ok(ModeChange::Unavailable));

    let out = render_block(&mut router, &mut media);
    assert_eq!(out[0], StereoSample::new(0.7, 0.4));
}
