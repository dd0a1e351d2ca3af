//! Pipeline topology selection.
//!
//! Decides which elements and caps a pipeline needs before anything is
//! allocated, so the decision table can be checked without a runtime:
//!
//! | Condition | Converter | Caps | Source |
//! |-----------|-----------|------|--------|
//! | no hardware converter | `videoconvert` | `video/x-raw,format=RGBA` | `playbin3` / `v4l2src` |
//! | hardware, file, inconsistent | `vapostproc` | DMABuf RGBA + `pixel-aspect-ratio` from the probe | `playbin3` |
//! | hardware, stream with URL params | `vapostproc` | RGBA + `width`/`height` + `pixel-aspect-ratio=1/1` | `playbin3` |
//! | hardware, anything else | `vapostproc` | DMABuf RGBA | `playbin3` / `v4l2src` |
//!
//! `playbin3` sources get an output bin (converter, filter, sink) attached as
//! their `video-sink`; camera sources link all elements directly.

use std::fmt::Write as _;

use crate::source::{FrameSize, SourceDescriptor, SourceKind};
use crate::stream_params::StreamParams;

/// Software colour converter, always available.
pub const SOFTWARE_CONVERTER: &str = "videoconvert";
/// VA-API post-processor; its presence selects the hardware path.
pub const HARDWARE_CONVERTER: &str = "vapostproc";
/// Feature-rich playback source used for files and streams.
pub const PLAYBACK_SOURCE: &str = "playbin3";
/// V4L2 capture source used for camera devices.
pub const CAMERA_SOURCE: &str = "v4l2src";

/// Decoder and post-processing elements promoted above generic decoders when
/// the hardware path is taken.
pub const HARDWARE_ELEMENTS: [&str; 7] = [
    "vah264dec",
    "vah265dec",
    "vapostproc",
    "vadeinterlace",
    "vampeg2dec",
    "vavp8dec",
    "vavp9dec",
];

const RGBA_CAPS: &str = "video/x-raw,format=RGBA";
const DMABUF_RGBA_CAPS: &str = "video/x-raw(memory:DMABuf),format=RGBA";

/// How the elements are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// `playbin3` with an output bin (converter ! capsfilter ! sink) exposed
    /// through a ghost pad as its `video-sink`
    PlaybackBin,
    /// source ! converter ! capsfilter ! sink in the top-level pipeline
    Direct,
}

/// Element kinds, caps and flags for one pipeline build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    pub source_element: &'static str,
    pub converter: &'static str,
    pub caps: String,
    pub topology: Topology,
    /// Ask the converter to add borders instead of stretching
    pub letterbox: bool,
    /// Hardware path selected; decoder ranks must be boosted
    pub hardware: bool,
    /// Parameters parsed from a stream URL, if it had a query
    pub stream_params: Option<StreamParams>,
}

impl PipelinePlan {
    /// Applies the decision table to a classified source.
    pub fn select(source: &SourceDescriptor, hardware_available: bool) -> Self {
        let stream_params = match source.kind() {
            SourceKind::Stream => StreamParams::extract(source.uri(), StreamParams::default()),
            _ => None,
        };

        let (source_element, topology) = match source.kind() {
            SourceKind::Camera => (CAMERA_SOURCE, Topology::Direct),
            SourceKind::File | SourceKind::Stream => (PLAYBACK_SOURCE, Topology::PlaybackBin),
        };

        let (converter, caps) = if hardware_available {
            (HARDWARE_CONVERTER, hardware_caps(source, stream_params.as_ref()))
        } else {
            (SOFTWARE_CONVERTER, RGBA_CAPS.to_string())
        };

        Self {
            source_element,
            converter,
            caps,
            topology,
            letterbox: !source.is_inconsistent(),
            hardware: hardware_available,
            stream_params,
        }
    }

    /// Name of the source element property that receives the URI or device.
    pub fn source_property(&self) -> &'static str {
        match self.topology {
            Topology::PlaybackBin => "uri",
            Topology::Direct => "device",
        }
    }

    /// Size to assume until the sink reports negotiated caps.
    pub fn initial_size(&self, source: &SourceDescriptor) -> Option<FrameSize> {
        if let Some(size) = source.default_size() {
            return Some(size);
        }
        let params = self.stream_params?;
        match (params.width, params.height) {
            (Some(width), Some(height)) => Some(FrameSize::new(width, height)),
            _ => None,
        }
    }
}

fn hardware_caps(source: &SourceDescriptor, stream_params: Option<&StreamParams>) -> String {
    if let Some(params) = stream_params {
        let mut caps = RGBA_CAPS.to_string();
        if let Some(width) = params.width {
            let _ = write!(caps, ",width={width}");
        }
        if let Some(height) = params.height {
            let _ = write!(caps, ",height={height}");
        }
        caps.push_str(",pixel-aspect-ratio=1/1");
        return caps;
    }

    let mut caps = DMABUF_RGBA_CAPS.to_string();
    if let Some(ratio) = source.resolved_aspect_ratio() {
        let _ = write!(caps, ",pixel-aspect-ratio={ratio}");
    }
    caps
}
