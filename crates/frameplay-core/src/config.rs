//! Player configuration.

use crate::source::FrameSize;

/// Environment variable that forces the software converter path.
pub const ENV_FORCE_SOFTWARE: &str = "FRAMEPLAY_FORCE_SOFTWARE";
/// Environment variable enabling auto-repeat.
pub const ENV_AUTO_REPEAT: &str = "FRAMEPLAY_AUTO_REPEAT";
/// Environment variable overriding [`PlayerConfig::probe_max_packets`].
pub const ENV_PROBE_MAX_PACKETS: &str = "FRAMEPLAY_PROBE_MAX_PACKETS";
/// Environment variable enabling the pipeline DOT dump on play.
pub const ENV_DUMP_GRAPH: &str = "FRAMEPLAY_DUMP_GRAPH";

/// Default number of packets the codec probe may read before giving up.
pub const DEFAULT_PROBE_MAX_PACKETS: usize = 256;

/// Default camera dimensions, used until the capture caps are known.
pub const DEFAULT_CAMERA_SIZE: FrameSize = FrameSize::new(1920, 1080);

/// Options applied when opening a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Seek back to the start whenever completion is delivered
    pub auto_repeat: bool,
    /// Allow the VA-API converter path when the runtime provides it
    pub hardware_acceleration: bool,
    /// Upper bound on packets the codec probe reads from a file
    pub probe_max_packets: usize,
    /// Dimensions assumed for camera sources
    pub camera_size: FrameSize,
    /// Write a DOT graph of the pipeline each time playback starts
    pub dump_pipeline_graph: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_repeat: false,
            hardware_acceleration: true,
            probe_max_packets: DEFAULT_PROBE_MAX_PACKETS,
            camera_size: DEFAULT_CAMERA_SIZE,
            dump_pipeline_graph: false,
        }
    }
}

impl PlayerConfig {
    /// Defaults overridden by `FRAMEPLAY_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if lookup(ENV_FORCE_SOFTWARE).is_some() {
            tracing::info!("{ENV_FORCE_SOFTWARE} set - hardware conversion disabled");
            self.hardware_acceleration = false;
        }
        if lookup(ENV_AUTO_REPEAT).is_some() {
            self.auto_repeat = true;
        }
        if lookup(ENV_DUMP_GRAPH).is_some() {
            self.dump_pipeline_graph = true;
        }
        if let Some(raw) = lookup(ENV_PROBE_MAX_PACKETS) {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.probe_max_packets = n,
                _ => tracing::warn!("Ignoring {ENV_PROBE_MAX_PACKETS}={raw}: expected a positive integer"),
            }
        }
        self
    }

    pub fn with_auto_repeat(mut self, auto_repeat: bool) -> Self {
        self.auto_repeat = auto_repeat;
        self
    }

    pub fn with_hardware_acceleration(mut self, enabled: bool) -> Self {
        self.hardware_acceleration = enabled;
        self
    }

    pub fn with_probe_max_packets(mut self, max_packets: usize) -> Self {
        self.probe_max_packets = max_packets.max(1);
        self
    }

    pub fn with_camera_size(mut self, size: FrameSize) -> Self {
        self.camera_size = size;
        self
    }

    pub fn with_pipeline_graph_dump(mut self, enabled: bool) -> Self {
        self.dump_pipeline_graph = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert!(!config.auto_repeat);
        assert!(config.hardware_acceleration);
        assert_eq!(config.probe_max_packets, 256);
        assert_eq!(config.camera_size, FrameSize::new(1920, 1080));
    }

    #[test]
    fn test_env_overrides() {
        let config = PlayerConfig::default().with_env_overrides(lookup(&[
            (ENV_FORCE_SOFTWARE, "1"),
            (ENV_AUTO_REPEAT, "1"),
            (ENV_PROBE_MAX_PACKETS, "32"),
        ]));
        assert!(!config.hardware_acceleration);
        assert!(config.auto_repeat);
        assert_eq!(config.probe_max_packets, 32);
        assert!(!config.dump_pipeline_graph);
    }

    #[test]
    fn test_bad_packet_bound_ignored() {
        let config = PlayerConfig::default()
            .with_env_overrides(lookup(&[(ENV_PROBE_MAX_PACKETS, "0")]));
        assert_eq!(config.probe_max_packets, DEFAULT_PROBE_MAX_PACKETS);
    }

    #[test]
    fn test_builder() {
        let config = PlayerConfig::default()
            .with_auto_repeat(true)
            .with_hardware_acceleration(false)
            .with_probe_max_packets(0)
            .with_pipeline_graph_dump(true);
        assert!(config.auto_repeat);
        assert!(!config.hardware_acceleration);
        assert_eq!(config.probe_max_packets, 1);
        assert!(config.dump_pipeline_graph);
    }
}
