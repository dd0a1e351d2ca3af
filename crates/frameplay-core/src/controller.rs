//! Playback state machine.
//!
//! [`PlaybackController`] owns a built pipeline and translates transport
//! requests into runtime state changes, queries and seeks.
//!
//! # State Machine
//!
//! ```text
//! build succeeds                  → Built
//! prepare(): PAUSED (+ wait)      → Prerolled   (failure: caller destroys)
//! play()                          → Playing
//! pause()                         → Paused
//! stop()                          → Stopped
//! destroy() / drop                → Destroyed   (terminal)
//! ```
//!
//! Only the preroll blocks on an asynchronous transition. `play`, `pause` and
//! `stop` report success as soon as the runtime accepts the request.
//!
//! Stream and camera sources have no timeline: seek, rate, duration and
//! position return their sentinels without touching the runtime.

use std::sync::Arc;

use crate::backend::{PipelineBackend, SeekMode, StateChange, TargetState};
use crate::completion::CompletionTracker;
use crate::error::PlayerError;
use crate::events::PlayerEvents;
use crate::frame_buffer::{FrameBuffer, FrameView};
use crate::source::{FrameSize, SourceDescriptor};

/// Lowest rate that still plays audio.
pub const MIN_AUDIBLE_RATE: f64 = 0.5;
/// Highest rate that still plays audio.
pub const MAX_AUDIBLE_RATE: f64 = 2.0;

/// Lifecycle of a controller. A controller only exists once its pipeline has
/// been built, so the pre-build state is not represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Built,
    Prerolled,
    Playing,
    Paused,
    Stopped,
    Destroyed,
}

/// Returns true if audio should be muted at `rate`.
pub fn is_muted_at(rate: f64) -> bool {
    rate < MIN_AUDIBLE_RATE || rate > MAX_AUDIBLE_RATE
}

/// Owns one pipeline and exposes the transport surface over it.
pub struct PlaybackController<B: PipelineBackend> {
    source: SourceDescriptor,
    backend: Option<B>,
    state: PlaybackState,
    frames: Arc<FrameBuffer<B::Frame>>,
    completion: Arc<CompletionTracker>,
    events: Arc<dyn PlayerEvents>,
    playback_rate: f64,
    mute: bool,
    volume: f64,
    auto_repeat: bool,
    initialized: bool,
    dump_graph: bool,
}

impl<B: PipelineBackend> PlaybackController<B> {
    /// Takes ownership of a freshly built pipeline.
    ///
    /// `frames` and `completion` must be the same holders the backend's
    /// runtime callbacks write into.
    pub fn new(
        source: SourceDescriptor,
        backend: B,
        frames: Arc<FrameBuffer<B::Frame>>,
        completion: Arc<CompletionTracker>,
        events: Arc<dyn PlayerEvents>,
    ) -> Self {
        Self {
            source,
            backend: Some(backend),
            state: PlaybackState::Built,
            frames,
            completion,
            events,
            playback_rate: 1.0,
            mute: false,
            volume: 1.0,
            auto_repeat: false,
            initialized: false,
            dump_graph: false,
        }
    }

    /// Writes a pipeline graph every time playback starts.
    pub fn with_graph_dump(mut self, enabled: bool) -> Self {
        self.dump_graph = enabled;
        self
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn auto_repeat(&self) -> bool {
        self.auto_repeat
    }

    pub fn frames(&self) -> &Arc<FrameBuffer<B::Frame>> {
        &self.frames
    }

    /// Prerolls, sizes the frame store and notifies the host once.
    ///
    /// `fallback_size` is used when the sink has not negotiated caps yet
    /// (camera defaults, stream URL parameters).
    pub fn prepare(&mut self, fallback_size: Option<FrameSize>) -> Result<(), PlayerError> {
        self.preroll()?;

        let size = self
            .backend
            .as_ref()
            .and_then(|b| b.video_size())
            .filter(|s| !s.is_empty())
            .or(fallback_size);
        match size {
            Some(size) => self.frames.resize(size),
            None => tracing::warn!(
                "Failed to get video size for {}; waiting for the first frame",
                self.source.uri()
            ),
        }

        if !self.initialized {
            self.initialized = true;
            self.events.on_initialized();
        }
        Ok(())
    }

    /// Requests PAUSED and, if the change is asynchronous, blocks until the
    /// runtime settles. The wait has no timeout.
    pub fn preroll(&mut self) -> Result<(), PlayerError> {
        let Some(backend) = self.backend.as_ref() else {
            return Err(PlayerError::StateTransition("pipeline destroyed".into()));
        };

        let change = backend.request_state(TargetState::Paused).map_err(|e| {
            tracing::error!("Failed to change the state to PAUSED: {e}");
            e
        })?;

        if change == StateChange::Async {
            backend.wait_for_state().map_err(|e| {
                tracing::error!("Failed to get the current state: {e}");
                e
            })?;
        }

        self.state = PlaybackState::Prerolled;
        Ok(())
    }

    pub fn play(&mut self) -> bool {
        if !self.transition(TargetState::Playing, PlaybackState::Playing) {
            return false;
        }
        if self.dump_graph {
            if let Some(backend) = &self.backend {
                backend.dump_graph("pipeline");
            }
        }
        true
    }

    pub fn pause(&mut self) -> bool {
        self.transition(TargetState::Paused, PlaybackState::Paused)
    }

    pub fn stop(&mut self) -> bool {
        self.transition(TargetState::Ready, PlaybackState::Stopped)
    }

    fn transition(&mut self, target: TargetState, next: PlaybackState) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        match backend.request_state(target) {
            Ok(change) => {
                tracing::debug!("Requested {target:?}: {change:?}");
                self.state = next;
                true
            }
            Err(e) => {
                tracing::error!("Failed to change the state to {target:?}: {e}");
                false
            }
        }
    }

    pub fn set_volume(&mut self, volume: f64) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let Some(applied) = backend.set_volume(volume) else {
            tracing::warn!("Source of {} has no volume control", self.source.uri());
            return false;
        };
        if applied != volume {
            tracing::debug!("Volume {volume} clamped to {applied}");
        }
        self.volume = applied;
        true
    }

    /// Changes the playback rate by re-seeking to the current position.
    ///
    /// Rejects non-positive rates. Audio is muted outside `[0.5, 2.0]`.
    pub fn set_playback_rate(&mut self, rate: f64) -> bool {
        if !self.source.kind().has_timeline() {
            return false;
        }
        if self.backend.is_none() {
            return false;
        }
        if !(rate > 0.0) {
            tracing::error!("Rate {rate} is not supported");
            return false;
        }

        let position = self.current_position();
        if position < 0 {
            return false;
        }

        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        if let Err(e) = backend.seek(rate, position, SeekMode::Flush) {
            tracing::error!("Failed to set playback rate to {rate}: {e}");
            return false;
        }

        self.playback_rate = rate;
        self.mute = is_muted_at(rate);
        backend.set_mute(self.mute);
        true
    }

    pub fn set_auto_repeat(&mut self, auto_repeat: bool) {
        self.auto_repeat = auto_repeat;
    }

    /// Seeks to `position_ms` with key-unit accuracy at the current rate.
    pub fn set_seek(&self, position_ms: i64) -> bool {
        if !self.source.kind().has_timeline() {
            return false;
        }
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        match backend.seek(self.playback_rate, position_ms, SeekMode::FlushKeyUnit) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to seek {position_ms}ms: {e}");
                false
            }
        }
    }

    /// Duration in milliseconds; `0` without a timeline, `-1` if unknown.
    pub fn duration(&self) -> i64 {
        if !self.source.kind().has_timeline() {
            return 0;
        }
        let Some(backend) = self.backend.as_ref() else {
            return -1;
        };
        match backend.duration_ms() {
            Some(duration) => duration,
            None => {
                tracing::warn!("Failed to get duration");
                -1
            }
        }
    }

    /// Position in milliseconds; `0` without a timeline, `-1` if unknown.
    ///
    /// Also delivers a pending completion to the host (and rewinds when
    /// auto-repeat is on), so hosts must poll this to observe end-of-stream.
    pub fn current_position(&self) -> i64 {
        if !self.source.kind().has_timeline() {
            return 0;
        }
        let Some(backend) = self.backend.as_ref() else {
            return -1;
        };
        let Some(position) = backend.position_ms() else {
            tracing::warn!("Failed to get current position");
            return -1;
        };

        self.drain_completion();
        position
    }

    fn drain_completion(&self) {
        if !self.completion.take() {
            return;
        }
        tracing::debug!("Delivering completion for {}", self.source.uri());
        self.events.on_completed();
        if self.auto_repeat {
            self.set_seek(0);
        }
    }

    /// Latest frame as RGBA bytes, or `None` before the first frame.
    pub fn frame_buffer(&self) -> Option<FrameView<'_>> {
        self.frames.read()
    }

    pub fn width(&self) -> i32 {
        i32::try_from(self.frames.size().width).unwrap_or(i32::MAX)
    }

    pub fn height(&self) -> i32 {
        i32::try_from(self.frames.size().height).unwrap_or(i32::MAX)
    }

    /// Stops and tears down the pipeline. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.state == PlaybackState::Destroyed {
            return;
        }
        if let Some(backend) = self.backend.as_ref() {
            if let Err(e) = backend.request_state(TargetState::Ready) {
                tracing::warn!("Failed to stop before teardown: {e}");
            }
        }
        self.frames.shutdown();
        if let Some(mut backend) = self.backend.take() {
            backend.teardown();
        }
        self.state = PlaybackState::Destroyed;
    }
}

impl<B: PipelineBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
