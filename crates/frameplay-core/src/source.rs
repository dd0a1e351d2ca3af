//! Source classification.
//!
//! A raw source string is sorted into one of three kinds before any pipeline
//! is built:
//!
//! | Input | Kind |
//! |-------|------|
//! | `/dev/videoN` | [`SourceKind::Camera`] |
//! | `rtp://`, `rtmp://`, `rtcp://`, `rtsp://`, `udp://` | [`SourceKind::Stream`] |
//! | `http(s)://…/name.m3u8`, `http(s)://…/name.flv` | [`SourceKind::Stream`] |
//! | anything else (URI or filesystem path) | [`SourceKind::File`] |
//!
//! Only file sources are handed to the [`CodecProbe`] for the inconsistency
//! check; streams and cameras never touch the probe.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::probe::{check_inconsistency, CodecProbe, Inconsistency};

/// Width and height of a video frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes an RGBA frame of this size occupies.
    pub fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel-aspect-ratio forced onto the converter output caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    /// `16/9`
    Wide,
    /// `9/16`
    Tall,
}

impl AspectRatio {
    /// Returns the ratio as a `(numerator, denominator)` pair.
    pub fn fraction(&self) -> (i32, i32) {
        match self {
            AspectRatio::Wide => (16, 9),
            AspectRatio::Tall => (9, 16),
        }
    }

    /// Returns the caps field value, e.g. `"16/9"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16/9",
            AspectRatio::Tall => "9/16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of media a source string refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Local file or any non-live URI; has a seekable timeline
    File,
    /// Live network stream; no timeline
    Stream,
    /// V4L2 capture device; no timeline
    Camera,
}

impl SourceKind {
    /// Returns true if position, duration, seek and rate are meaningful.
    pub fn has_timeline(&self) -> bool {
        matches!(self, SourceKind::File)
    }
}

/// Classified description of a media source.
///
/// Built once by [`SourceClassifier::classify`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    raw: String,
    uri: String,
    kind: SourceKind,
    inconsistency: Option<Inconsistency>,
    default_size: Option<FrameSize>,
}

impl SourceDescriptor {
    /// The input string exactly as supplied by the caller.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The canonical URI (or device path for cameras) handed to the source element.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// True if the probe found coded dimensions outside the resolution table.
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistency.is_some()
    }

    /// Pixel-aspect-ratio correction chosen by the inconsistency check.
    pub fn resolved_aspect_ratio(&self) -> Option<AspectRatio> {
        self.inconsistency.map(|i| i.aspect_ratio)
    }

    /// Coded size reported by the probe when the source was flagged.
    pub fn coded_size(&self) -> Option<FrameSize> {
        self.inconsistency.map(|i| i.coded_size)
    }

    /// Dimensions assumed before the pipeline reports any caps.
    pub fn default_size(&self) -> Option<FrameSize> {
        self.default_size
    }
}

fn camera_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^/dev/video[0-9]+$").expect("camera path regex"))
}

fn realtime_scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:rtp|rtmp|rtcp|rtsp|udp)://").expect("realtime scheme regex")
    })
}

fn http_live_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^https?://[^?#]*\.(?:m3u8|flv)(?:[?#].*)?$").expect("http live regex")
    })
}

fn uri_scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("uri scheme regex"))
}

/// Returns true if `input` names a V4L2 capture device such as `/dev/video0`.
pub fn is_camera_path(input: &str) -> bool {
    camera_path_regex().is_match(input)
}

/// Returns true if `uri` is a live stream: a realtime protocol, or an HTTP(S)
/// URL whose path ends in `.m3u8` or `.flv`.
pub fn is_stream_uri(uri: &str) -> bool {
    realtime_scheme_regex().is_match(uri) || http_live_regex().is_match(uri)
}

/// Returns true if `input` already has the `scheme://` form of a URI.
pub fn is_valid_uri(input: &str) -> bool {
    uri_scheme_regex().is_match(input)
}

/// Resolves `input` to a URI.
///
/// Inputs already in URI form pass through. Filesystem paths become `file://`
/// URIs, relative paths being resolved against the working directory. When no
/// URI can be synthesized the failure is logged and the input is returned
/// verbatim.
pub fn resolve_uri(input: &str) -> String {
    if is_valid_uri(input) {
        return input.to_string();
    }

    match filename_to_uri(Path::new(input)) {
        Some(uri) => uri,
        None => {
            tracing::warn!("Failed to open {input}: cannot build a file URI, using it verbatim");
            input.to_string()
        }
    }
}

fn filename_to_uri(path: &Path) -> Option<String> {
    if path.as_os_str().is_empty() {
        return None;
    }
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(&absolute).ok().map(String::from)
}

/// Sorts source strings into [`SourceDescriptor`]s.
pub struct SourceClassifier<'a> {
    probe: &'a dyn CodecProbe,
    camera_size: FrameSize,
}

impl<'a> SourceClassifier<'a> {
    pub fn new(probe: &'a dyn CodecProbe, camera_size: FrameSize) -> Self {
        Self { probe, camera_size }
    }

    /// Classifies `input`, probing local files for inconsistent coded sizes.
    pub fn classify(&self, input: &str) -> SourceDescriptor {
        if is_camera_path(input) {
            tracing::debug!("Camera source: {input}");
            return SourceDescriptor {
                raw: input.to_string(),
                uri: input.to_string(),
                kind: SourceKind::Camera,
                inconsistency: None,
                default_size: Some(self.camera_size),
            };
        }

        let uri = resolve_uri(input);
        let kind = if is_stream_uri(&uri) {
            SourceKind::Stream
        } else {
            SourceKind::File
        };

        let inconsistency = match kind {
            SourceKind::File => check_inconsistency(self.probe, input),
            _ => None,
        };

        tracing::debug!(
            "Classified {input} as {:?} (uri={uri}, inconsistent={})",
            kind,
            inconsistency.is_some()
        );

        SourceDescriptor {
            raw: input.to_string(),
            uri,
            kind,
            inconsistency,
            default_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlayerError;
    use crate::probe::CodedSize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
        result: Result<CodedSize, PlayerError>,
    }

    impl CountingProbe {
        fn returning(result: Result<CodedSize, PlayerError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CodecProbe for CountingProbe {
        fn probe(&self, _uri: &str) -> Result<CodedSize, PlayerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    const CAMERA: FrameSize = FrameSize::new(1920, 1080);

    #[test]
    fn test_camera_paths() {
        let probe = CountingProbe::returning(Ok(CodedSize::new(1280, 720)));
        let classifier = SourceClassifier::new(&probe, CAMERA);

        for path in ["/dev/video0", "/dev/video3", "/DEV/VIDEO9"] {
            let desc = classifier.classify(path);
            assert_eq!(desc.kind(), SourceKind::Camera);
            assert_eq!(desc.uri(), path);
            assert_eq!(desc.default_size(), Some(CAMERA));
            assert!(!desc.is_inconsistent());
        }
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn test_camera_path_must_match_whole_input() {
        assert!(!is_camera_path("/dev/video"));
        assert!(!is_camera_path("/home/me/dev/video0"));
        assert!(!is_camera_path("/dev/video0.mp4"));
    }

    #[test]
    fn test_realtime_schemes_are_streams() {
        for uri in [
            "rtsp://192.168.1.10/live",
            "RTSP://camera.local:554/stream?w=800&h=1200&o=p",
            "rtmp://media.example.com/app/key",
            "rtp://239.0.0.1:5004",
            "rtcp://239.0.0.1:5005",
            "udp://0.0.0.0:1234",
        ] {
            assert!(is_stream_uri(uri), "{uri}");
        }
    }

    #[test]
    fn test_http_live_extensions_are_streams() {
        assert!(is_stream_uri("https://cdn.example.com/live/index.m3u8"));
        assert!(is_stream_uri("http://cdn.example.com/live/channel.FLV"));
        assert!(is_stream_uri("https://cdn.example.com/live/index.m3u8?w=1080&h=1920"));
        assert!(!is_stream_uri("https://cdn.example.com/movie.mp4"));
        assert!(!is_stream_uri("https://cdn.example.com/m3u8/movie.mp4"));
        assert!(!is_stream_uri("file:///tmp/index.m3u8"));
    }

    #[test]
    fn test_streams_are_never_probed() {
        let probe = CountingProbe::returning(Ok(CodedSize::new(1280, 720)));
        let classifier = SourceClassifier::new(&probe, CAMERA);

        let desc = classifier.classify("rtsp://host/stream");
        assert_eq!(desc.kind(), SourceKind::Stream);
        assert!(!desc.is_inconsistent());
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn test_file_path_becomes_file_uri() {
        let probe = CountingProbe::returning(Ok(CodedSize::new(1920, 1080)));
        let classifier = SourceClassifier::new(&probe, CAMERA);

        let desc = classifier.classify("/tmp/clip.mp4");
        assert_eq!(desc.kind(), SourceKind::File);
        assert_eq!(desc.uri(), "file:///tmp/clip.mp4");
        assert_eq!(desc.raw(), "/tmp/clip.mp4");
        assert_eq!(probe.calls(), 1);
        assert!(!desc.is_inconsistent());
    }

    #[test]
    fn test_relative_path_resolves_against_cwd() {
        let uri = resolve_uri("clip.mp4");
        assert!(uri.starts_with("file:///"), "{uri}");
        assert!(uri.ends_with("/clip.mp4"), "{uri}");
    }

    #[test]
    fn test_valid_uri_passes_through() {
        assert_eq!(
            resolve_uri("https://example.com/a.mp4"),
            "https://example.com/a.mp4"
        );
        assert_eq!(resolve_uri("file:///a%20b.mp4"), "file:///a%20b.mp4");
    }

    #[test]
    fn test_empty_input_used_verbatim() {
        assert_eq!(resolve_uri(""), "");
    }

    #[test]
    fn test_inconsistent_file_is_flagged() {
        let probe = CountingProbe::returning(Ok(CodedSize::new(1280, 720)));
        let classifier = SourceClassifier::new(&probe, CAMERA);

        let desc = classifier.classify("/videos/720p.mp4");
        assert!(desc.is_inconsistent());
        assert_eq!(desc.resolved_aspect_ratio(), Some(AspectRatio::Wide));
        assert_eq!(desc.coded_size(), Some(FrameSize::new(1280, 720)));
    }

    #[test]
    fn test_probe_failure_is_consistent() {
        let probe = CountingProbe::returning(Err(PlayerError::Probe("open".into())));
        let classifier = SourceClassifier::new(&probe, CAMERA);

        let desc = classifier.classify("/videos/missing.mp4");
        assert_eq!(desc.kind(), SourceKind::File);
        assert!(!desc.is_inconsistent());
        assert_eq!(desc.resolved_aspect_ratio(), None);
    }

    #[test]
    fn test_frame_size() {
        let size = FrameSize::new(1920, 1080);
        assert_eq!(size.rgba_len(), 1920 * 1080 * 4);
        assert_eq!(size.to_string(), "1920x1080");
        assert!(FrameSize::new(0, 1080).is_empty());
    }
}
