//! Coded-size probe backed by FFmpeg.
//!
//! Decoders report the size of the coded picture, which can differ from the
//! display size when the encoder padded to a macroblock boundary. Sources whose
//! coded size is not in the resolution table get a pixel-aspect-ratio
//! correction in the hardware caps.

use std::path::PathBuf;

use ffmpeg_next as ffmpeg;
use url::Url;

use frameplay_core::config::DEFAULT_PROBE_MAX_PACKETS;
use frameplay_core::{CodecProbe, CodedSize, FrameSize, PlayerError};

/// Opens a local file and reads the decoder's coded size after the first
/// packet it accepts.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegProbe {
    max_packets: usize,
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_MAX_PACKETS)
    }
}

impl FfmpegProbe {
    /// Creates a probe that gives up after `max_packets` demuxed packets.
    pub fn new(max_packets: usize) -> Self {
        Self {
            max_packets: max_packets.max(1),
        }
    }

    pub fn max_packets(&self) -> usize {
        self.max_packets
    }
}

fn probe_error<'a>(what: &'static str, uri: &'a str) -> impl Fn(ffmpeg::Error) -> PlayerError + 'a {
    move |e| PlayerError::Probe(format!("{what} for {uri}: {e}"))
}

/// Filesystem path of a `file://` URI with percent-escapes decoded; other
/// inputs pass through unchanged.
fn local_path(uri: &str) -> PathBuf {
    Url::parse(uri)
        .ok()
        .filter(|url| url.scheme() == "file")
        .and_then(|url| url.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(uri))
}

impl CodecProbe for FfmpegProbe {
    fn probe(&self, uri: &str) -> Result<CodedSize, PlayerError> {
        ffmpeg::init().map_err(|e| PlayerError::Probe(format!("FFmpeg init failed: {e}")))?;

        let path = local_path(uri);
        let mut input =
            ffmpeg::format::input(&path).map_err(probe_error("Could not open input", uri))?;

        let (index, mut decoder) = {
            let stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| PlayerError::Probe(format!("No video stream in {uri}")))?;
            let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(probe_error("Could not read codec parameters", uri))?;
            let decoder = context
                .decoder()
                .video()
                .map_err(probe_error("Could not open decoder", uri))?;
            (stream.index(), decoder)
        };

        for (stream, packet) in input.packets().take(self.max_packets) {
            if stream.index() != index {
                continue;
            }
            if decoder.send_packet(&packet).is_err() {
                continue;
            }

            // SAFETY: the decoder owns a valid AVCodecContext for its whole
            // lifetime; only plain integer fields are read.
            let (width, height) = unsafe {
                let ctx = decoder.as_ptr();
                ((*ctx).coded_width, (*ctx).coded_height)
            };
            let coded = FrameSize::new(
                u32::try_from(width).unwrap_or(0),
                u32::try_from(height).unwrap_or(0),
            );
            tracing::debug!("Coded size of {uri}: {coded}");
            return Ok(coded);
        }

        Err(PlayerError::Probe(format!(
            "No video packet accepted within {} packets of {uri}",
            self.max_packets
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_bound_is_positive() {
        assert_eq!(FfmpegProbe::new(0).max_packets(), 1);
        assert_eq!(FfmpegProbe::default().max_packets(), DEFAULT_PROBE_MAX_PACKETS);
    }

    #[test]
    fn test_file_uri_escapes_decoded() {
        assert_eq!(local_path("file:///a%20b.mp4"), PathBuf::from("/a b.mp4"));
        assert_eq!(
            local_path("file:///videos/caf%C3%A9.mkv"),
            PathBuf::from("/videos/café.mkv")
        );
        assert_eq!(local_path("/plain/clip.mp4"), PathBuf::from("/plain/clip.mp4"));
        assert_eq!(local_path("clip 1.mp4"), PathBuf::from("clip 1.mp4"));
    }

    #[test]
    fn test_missing_file_is_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.mp4");
        let err = FfmpegProbe::default()
            .probe(path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, PlayerError::Probe(_)));
    }

    #[test]
    fn test_non_media_file_is_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp4");
        std::fs::write(&path, b"not a video").unwrap();
        let err = FfmpegProbe::default()
            .probe(path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, PlayerError::Probe(_)));
    }
}
