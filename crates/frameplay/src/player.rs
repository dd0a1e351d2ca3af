//! Public player handle.

use std::sync::Arc;

use frameplay_core::{
    CodecProbe, CompletionTracker, FrameBuffer, FrameView, PipelinePlan, PlaybackController,
    PlaybackState, PlayerConfig, PlayerError, PlayerEvents, SourceClassifier, SourceDescriptor,
};

use crate::pipeline::GstPipeline;
use crate::runtime;

#[cfg(feature = "ffmpeg")]
fn default_probe(config: &PlayerConfig) -> Box<dyn CodecProbe> {
    Box::new(crate::probe::FfmpegProbe::new(config.probe_max_packets))
}

#[cfg(not(feature = "ffmpeg"))]
fn default_probe(_config: &PlayerConfig) -> Box<dyn CodecProbe> {
    Box::new(frameplay_core::NullProbe)
}

/// One video source decoded into RGBA frames.
///
/// Opening classifies the input, builds the pipeline and prerolls it; a
/// returned player is ready for [`play`](Self::play). Dropping it tears the
/// pipeline down.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use frameplay::{ChannelEvents, PlayerConfig, VideoPlayer};
///
/// let (events, rx) = ChannelEvents::unbounded();
/// let mut player = VideoPlayer::open("/videos/intro.mp4", Arc::new(events), PlayerConfig::from_env())?;
/// player.play();
/// if let Some(frame) = player.frame_buffer() {
///     println!("{} bytes at {}x{}", frame.len(), player.width(), player.height());
/// }
/// # Ok::<(), frameplay::PlayerError>(())
/// ```
pub struct VideoPlayer {
    controller: PlaybackController<GstPipeline>,
}

impl VideoPlayer {
    /// Opens `input`: a file path, a URI, or a `/dev/videoN` camera device.
    ///
    /// `on_initialized` has fired by the time this returns `Ok`.
    pub fn open(
        input: &str,
        events: Arc<dyn PlayerEvents>,
        config: PlayerConfig,
    ) -> Result<Self, PlayerError> {
        let capabilities = runtime::capabilities()?;

        let probe = default_probe(&config);
        let source = SourceClassifier::new(probe.as_ref(), config.camera_size).classify(input);

        let hardware = config.hardware_acceleration && capabilities.hardware_converter;
        if config.hardware_acceleration && !capabilities.hardware_converter {
            tracing::info!("vapostproc not available, using software conversion");
        }
        let plan = PipelinePlan::select(&source, hardware);
        capabilities.require_source(plan.source_element)?;
        let initial_size = plan.initial_size(&source);

        let frames = Arc::new(FrameBuffer::new(initial_size.unwrap_or_default()));
        let completion = Arc::new(CompletionTracker::new());
        let backend = GstPipeline::build(
            &plan,
            source.uri(),
            Arc::clone(&frames),
            Arc::clone(&completion),
            Arc::clone(&events),
        )?;

        let mut controller = PlaybackController::new(source, backend, frames, completion, events)
            .with_graph_dump(config.dump_pipeline_graph);
        controller.set_auto_repeat(config.auto_repeat);

        // The controller tears the pipeline down if this fails.
        controller.prepare(initial_size)?;

        Ok(Self { controller })
    }

    pub fn source(&self) -> &SourceDescriptor {
        self.controller.source()
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn play(&mut self) -> bool {
        self.controller.play()
    }

    pub fn pause(&mut self) -> bool {
        self.controller.pause()
    }

    pub fn stop(&mut self) -> bool {
        self.controller.stop()
    }

    /// Sets the source volume. Returns `false` if the source has none.
    pub fn set_volume(&mut self, volume: f64) -> bool {
        self.controller.set_volume(volume)
    }

    /// Changes playback speed. Audio is muted below 0.5x and above 2x.
    pub fn set_playback_rate(&mut self, rate: f64) -> bool {
        self.controller.set_playback_rate(rate)
    }

    pub fn playback_rate(&self) -> f64 {
        self.controller.playback_rate()
    }

    pub fn is_muted(&self) -> bool {
        self.controller.is_muted()
    }

    pub fn set_auto_repeat(&mut self, auto_repeat: bool) {
        self.controller.set_auto_repeat(auto_repeat);
    }

    /// Seeks to `position_ms` (snapped to a key frame).
    pub fn set_seek(&self, position_ms: i64) -> bool {
        self.controller.set_seek(position_ms)
    }

    /// Duration in milliseconds: `0` for streams and cameras, `-1` if unknown.
    pub fn duration(&self) -> i64 {
        self.controller.duration()
    }

    /// Position in milliseconds: `0` for streams and cameras, `-1` if unknown.
    ///
    /// Completion is reported to the host from inside this call.
    pub fn current_position(&self) -> i64 {
        self.controller.current_position()
    }

    /// Latest decoded frame as tightly packed RGBA.
    pub fn frame_buffer(&self) -> Option<FrameView<'_>> {
        self.controller.frame_buffer()
    }

    /// Number of frames the pipeline has delivered so far.
    pub fn frames_delivered(&self) -> u64 {
        self.controller.frames().delivered()
    }

    pub fn width(&self) -> i32 {
        self.controller.width()
    }

    pub fn height(&self) -> i32 {
        self.controller.height()
    }

    /// Stops playback and releases the pipeline now rather than on drop.
    pub fn close(mut self) {
        self.controller.destroy();
    }
}
