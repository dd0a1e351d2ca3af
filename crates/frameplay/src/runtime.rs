//! Process-wide GStreamer setup.
//!
//! Both operations here touch global runtime state and are safe to call from
//! any number of players: initialization happens once, and the decoder rank
//! boost is applied once and never reverted.

use std::sync::{Once, OnceLock};

use gstreamer as gst;
use gstreamer::prelude::*;

use frameplay_core::plan::{CAMERA_SOURCE, HARDWARE_CONVERTER, HARDWARE_ELEMENTS, PLAYBACK_SOURCE};
use frameplay_core::PlayerError;

/// Rank given to the VA-API elements so autoplugging prefers them.
const HARDWARE_RANK_BOOST: i32 = 100;

/// Initializes GStreamer once for the process.
///
/// The first outcome is cached: a failed init is reported to every caller
/// rather than retried.
pub fn init() -> Result<(), PlayerError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();
    INIT.get_or_init(|| {
        gst::init().map_err(|e| e.to_string())?;
        tracing::info!("GStreamer {} initialized", gst::version_string());
        Ok(())
    })
    .clone()
    .map_err(|e| PlayerError::RuntimeInit(format!("GStreamer init failed: {e}")))
}

/// Elements available in this runtime that affect pipeline selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `vapostproc` is registered; selects the hardware path
    pub hardware_converter: bool,
    /// `playbin3` is registered
    pub playback_source: bool,
    /// `v4l2src` is registered
    pub camera_source: bool,
}

impl Capabilities {
    /// Fails if the source element `element` is not installed.
    pub fn require_source(&self, element: &str) -> Result<(), PlayerError> {
        let available = match element {
            PLAYBACK_SOURCE => self.playback_source,
            CAMERA_SOURCE => self.camera_source,
            other => has_element(other),
        };
        if available {
            Ok(())
        } else {
            Err(PlayerError::Allocation(format!("{element} is not installed")))
        }
    }
}

/// Reports which of the elements the planner cares about are installed.
///
/// The registry is inspected once; later calls return the cached report.
pub fn capabilities() -> Result<Capabilities, PlayerError> {
    static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();
    init()?;
    Ok(*CAPABILITIES.get_or_init(|| {
        let caps = Capabilities {
            hardware_converter: has_element(HARDWARE_CONVERTER),
            playback_source: has_element(PLAYBACK_SOURCE),
            camera_source: has_element(CAMERA_SOURCE),
        };
        tracing::info!("Runtime capabilities: {caps:?}");
        caps
    }))
}

/// True if an element factory named `name` is registered.
pub fn has_element(name: &str) -> bool {
    gst::ElementFactory::find(name).is_some()
}

/// Promotes the VA-API decoders and post-processors above the generic ones.
///
/// Runs at most once per process. Elements missing from the registry are
/// skipped.
pub fn boost_hardware_ranks() {
    static BOOST: Once = Once::new();
    BOOST.call_once(|| {
        let registry = gst::Registry::get();
        for name in HARDWARE_ELEMENTS {
            match registry.lookup_feature(name) {
                Some(feature) => {
                    let rank = gst::Rank::PRIMARY + HARDWARE_RANK_BOOST;
                    feature.set_rank(rank);
                    tracing::debug!("Boosted {name} to rank {rank:?}");
                }
                None => tracing::debug!("{name} not registered, rank unchanged"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        if init().is_err() {
            eprintln!("GStreamer unavailable, skipping");
            return;
        }
        assert!(init().is_ok());
    }

    #[test]
    fn test_rank_boost_is_idempotent() {
        if init().is_err() {
            return;
        }
        boost_hardware_ranks();
        boost_hardware_ranks();
        if let Some(feature) = gst::Registry::get().lookup_feature(HARDWARE_CONVERTER) {
            assert_eq!(feature.rank(), gst::Rank::PRIMARY + HARDWARE_RANK_BOOST);
        }
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let caps = Capabilities {
            hardware_converter: false,
            playback_source: true,
            camera_source: false,
        };
        assert!(caps.require_source(PLAYBACK_SOURCE).is_ok());
        let err = caps.require_source(CAMERA_SOURCE).unwrap_err();
        assert!(matches!(err, PlayerError::Allocation(_)));
        assert!(err.to_string().contains(CAMERA_SOURCE));
    }

    #[test]
    fn test_capabilities_reflect_registry() {
        let Ok(caps) = capabilities() else {
            return;
        };
        assert_eq!(caps.hardware_converter, has_element(HARDWARE_CONVERTER));
        assert_eq!(caps.playback_source, has_element(PLAYBACK_SOURCE));
        assert_eq!(caps.camera_source, has_element(CAMERA_SOURCE));
        assert!(!has_element("frameplay-no-such-element"));
    }
}
