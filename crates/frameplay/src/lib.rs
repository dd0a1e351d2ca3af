//! frameplay: GStreamer video playback that hands RGBA frames to a host renderer.
//!
//! The host opens a [`VideoPlayer`] on a file, a network stream or a V4L2
//! camera, drives it with transport calls and pulls the latest decoded frame
//! whenever it redraws. Notifications arrive through [`PlayerEvents`].
//!
//! # Pipelines
//!
//! | Source | Element | Timeline |
//! |--------|---------|----------|
//! | local file / `file://` / HTTP VOD | `playbin3` | seek, rate, duration |
//! | `rtsp://`, `rtmp://`, `udp://`, HLS, FLV | `playbin3` | none (0 sentinels) |
//! | `/dev/videoN` | `v4l2src` | none (0 sentinels) |
//!
//! When `vapostproc` is installed, conversion to RGBA runs on the GPU and the
//! VA-API decoders are promoted process-wide. Otherwise `videoconvert` is used.
//!
//! # Feature Flags
//!
//! - `ffmpeg` (default): probe local files for coded sizes outside the
//!   resolution table before building the pipeline. Without it no source is
//!   ever flagged.
//!
//! # Environment
//!
//! [`PlayerConfig::from_env`] reads `FRAMEPLAY_FORCE_SOFTWARE`,
//! `FRAMEPLAY_AUTO_REPEAT`, `FRAMEPLAY_PROBE_MAX_PACKETS` and
//! `FRAMEPLAY_DUMP_GRAPH`. Graph dumps also need `GST_DEBUG_DUMP_DOT_DIR`.

pub mod pipeline;
pub mod player;
#[cfg(feature = "ffmpeg")]
pub mod probe;
pub mod runtime;

pub use frameplay_core::{
    AspectRatio, ChannelEvents, CodecProbe, ErrorKind, FrameSize, FrameView, PlaybackState,
    PlayerConfig, PlayerError, PlayerEvent, PlayerEvents, SourceDescriptor, SourceKind,
};

pub use pipeline::{GstFrame, GstPipeline};
pub use player::VideoPlayer;
#[cfg(feature = "ffmpeg")]
pub use probe::FfmpegProbe;
pub use runtime::Capabilities;
