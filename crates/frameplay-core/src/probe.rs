//! Pre-flight codec inspection.
//!
//! Some files declare one resolution in their container and carry another in
//! the bitstream. Before the pipeline is built, local files are opened with a
//! [`CodecProbe`] and the coded size of the first video stream is compared
//! against [`RESOLUTION_TABLE`](crate::resolution::RESOLUTION_TABLE). A size
//! outside the table marks the source inconsistent and selects a
//! pixel-aspect-ratio correction.
//!
//! Probing is fail-open: any probe error is logged and the source is treated
//! as consistent.

use crate::error::PlayerError;
use crate::resolution;
use crate::source::{AspectRatio, FrameSize};

/// Coded dimensions of the first decodable video packet.
pub type CodedSize = FrameSize;

/// Opens a source, decodes until the first packet is accepted, and reports
/// the coded resolution of the first video stream.
///
/// Implementations release every resource they acquired on all paths.
pub trait CodecProbe: Send + Sync {
    /// Returns the coded size, or an error if no packet of the first video
    /// stream could be decoded.
    fn probe(&self, uri: &str) -> Result<CodedSize, PlayerError>;
}

/// Probe used when no inspection backend is compiled in. Always fails, so
/// every file is treated as consistent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl CodecProbe for NullProbe {
    fn probe(&self, _uri: &str) -> Result<CodedSize, PlayerError> {
        Err(PlayerError::Probe("no codec probe available".into()))
    }
}

/// Result of a positive inconsistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inconsistency {
    pub coded_size: CodedSize,
    pub aspect_ratio: AspectRatio,
}

impl Inconsistency {
    /// Compares a coded size against the resolution table.
    ///
    /// Returns `None` when both dimensions are supported table entries.
    pub fn from_coded_size(coded: CodedSize) -> Option<Self> {
        if resolution::is_supported(coded.width) && resolution::is_supported(coded.height) {
            return None;
        }
        let aspect_ratio = if coded.width > coded.height {
            AspectRatio::Wide
        } else {
            AspectRatio::Tall
        };
        Some(Self {
            coded_size: coded,
            aspect_ratio,
        })
    }
}

/// Probes `uri` and decides whether its coded size needs correcting.
pub fn check_inconsistency(probe: &dyn CodecProbe, uri: &str) -> Option<Inconsistency> {
    match probe.probe(uri) {
        Ok(coded) => {
            let result = Inconsistency::from_coded_size(coded);
            if let Some(ref found) = result {
                tracing::info!(
                    "Coded size {} of {uri} is not a supported resolution, forcing pixel-aspect-ratio {}",
                    found.coded_size,
                    found.aspect_ratio
                );
            } else {
                tracing::debug!("Coded size {coded} of {uri} is consistent");
            }
            result
        }
        Err(e) => {
            tracing::warn!("Skipping inconsistency check for {uri}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(Result<CodedSize, PlayerError>);

    impl CodecProbe for FixedProbe {
        fn probe(&self, _uri: &str) -> Result<CodedSize, PlayerError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_supported_sizes_are_consistent() {
        assert_eq!(Inconsistency::from_coded_size(FrameSize::new(1920, 1080)), None);
        assert_eq!(Inconsistency::from_coded_size(FrameSize::new(1080, 1920)), None);
        assert_eq!(Inconsistency::from_coded_size(FrameSize::new(3480, 2160)), None);
    }

    #[test]
    fn test_720p_is_inconsistent_and_wide() {
        let found = Inconsistency::from_coded_size(FrameSize::new(1280, 720)).unwrap();
        assert_eq!(found.aspect_ratio, AspectRatio::Wide);
        assert_eq!(found.aspect_ratio.as_str(), "16/9");
    }

    #[test]
    fn test_portrait_is_tall() {
        let found = Inconsistency::from_coded_size(FrameSize::new(720, 1280)).unwrap();
        assert_eq!(found.aspect_ratio, AspectRatio::Tall);
    }

    #[test]
    fn test_square_is_tall() {
        let found = Inconsistency::from_coded_size(FrameSize::new(1000, 1000)).unwrap();
        assert_eq!(found.aspect_ratio.as_str(), "9/16");
    }

    #[test]
    fn test_one_bad_dimension_is_enough() {
        // 1920x1088 is what many H.264 encoders report for 1080p content
        let found = Inconsistency::from_coded_size(FrameSize::new(1920, 1088)).unwrap();
        assert_eq!(found.aspect_ratio, AspectRatio::Wide);
    }

    #[test]
    fn test_probe_failure_fails_open() {
        let probe = FixedProbe(Err(PlayerError::Probe("could not open the file".into())));
        assert_eq!(check_inconsistency(&probe, "/missing.mp4"), None);
        assert_eq!(check_inconsistency(&NullProbe, "/any.mp4"), None);
    }

    #[test]
    fn test_check_reports_inconsistency() {
        let probe = FixedProbe(Ok(FrameSize::new(1280, 720)));
        let found = check_inconsistency(&probe, "/720p.mp4").unwrap();
        assert_eq!(found.coded_size, FrameSize::new(1280, 720));
    }
}
