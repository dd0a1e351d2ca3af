//! Public API surface of the frameplay crate.
//!
//! Core types must stay reachable through `frameplay::` so hosts only depend
//! on one crate. Runtime tests return early when GStreamer is not installed.

#[allow(unused_imports)]
use frameplay::{
    AspectRatio, Capabilities, ChannelEvents, CodecProbe, ErrorKind, FrameSize, FrameView,
    GstFrame, GstPipeline, PlaybackState, PlayerConfig, PlayerError, PlayerEvent, PlayerEvents,
    SourceDescriptor, SourceKind, VideoPlayer,
};

use std::sync::Arc;

#[test]
fn public_types_are_accessible() {
    fn _assert_types() {
        let _: fn() -> SourceKind = || SourceKind::Camera;
        let _: fn() -> AspectRatio = || AspectRatio::Wide;
        let _: fn() -> PlaybackState = || PlaybackState::Prerolled;
        let _: fn() -> ErrorKind = || ErrorKind::Link;
    }
    fn _assert_send<T: Send>() {}
    _assert_send::<VideoPlayer>();
}

#[test]
fn open_missing_file_fails_cleanly() {
    if frameplay::runtime::init().is_err() {
        eprintln!("GStreamer unavailable, skipping");
        return;
    }
    if !frameplay::runtime::has_element("playbin3") {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.mp4");
    let (events, rx) = ChannelEvents::unbounded();
    let config = PlayerConfig::default().with_hardware_acceleration(false);

    let result = VideoPlayer::open(path.to_str().unwrap(), Arc::new(events), config);
    assert!(result.is_err());
    assert!(rx.try_iter().all(|e| e != PlayerEvent::Initialized));
}

#[test]
fn open_unknown_camera_fails_cleanly() {
    if frameplay::runtime::init().is_err() || !frameplay::runtime::has_element("v4l2src") {
        return;
    }
    let (events, rx) = ChannelEvents::unbounded();
    let result = VideoPlayer::open(
        "/dev/video987",
        Arc::new(events),
        PlayerConfig::default().with_hardware_acceleration(false),
    );
    assert!(result.is_err());
    assert_eq!(rx.try_iter().count(), 0);
}
