//! Seam between the playback state machine and a concrete pipeline runtime.

use crate::error::PlayerError;
use crate::frame_buffer::FrameData;
use crate::source::FrameSize;

/// Runtime state the controller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Resources allocated, no data flowing (used by `stop`)
    Ready,
    /// Prerolled, clock stopped
    Paused,
    Playing,
}

/// Outcome of an accepted state-change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// Reached synchronously
    Success,
    /// Will complete in the background
    Async,
    /// Reached, but live sources will not preroll
    NoPreroll,
}

/// Seek flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Flush only; used when re-issuing the current position at a new rate
    Flush,
    /// Flush and snap to the nearest key unit; used for absolute seeks
    FlushKeyUnit,
}

/// A fully built and linked pipeline.
///
/// Implementations are owned exclusively by one
/// [`PlaybackController`](crate::controller::PlaybackController) and are
/// destroyed as a whole through [`teardown`](PipelineBackend::teardown).
pub trait PipelineBackend: Send {
    /// Buffer handle the streaming thread delivers frames in.
    type Frame: FrameData;

    /// Requests a state change. `Err` means the runtime rejected it outright.
    fn request_state(&self, target: TargetState) -> Result<StateChange, PlayerError>;

    /// Blocks until a pending asynchronous state change settles. No timeout.
    fn wait_for_state(&self) -> Result<(), PlayerError>;

    /// Seeks to `position_ms` at `rate`, leaving the stop position open.
    fn seek(&self, rate: f64, position_ms: i64, mode: SeekMode) -> Result<(), PlayerError>;

    /// Stream duration in milliseconds, if the runtime can report one.
    fn duration_ms(&self) -> Option<i64>;

    /// Current position in milliseconds, if the runtime can report one.
    fn position_ms(&self) -> Option<i64>;

    /// Applies volume to the source, clamped to what the source accepts.
    /// Returns the value actually applied, or `None` without a volume control.
    fn set_volume(&self, volume: f64) -> Option<f64>;

    /// Applies the mute flag to the source, if it supports one.
    fn set_mute(&self, mute: bool);

    /// Negotiated video size from the sink caps, once known.
    fn video_size(&self) -> Option<FrameSize>;

    /// Writes a debug graph of the pipeline, when supported.
    fn dump_graph(&self, _name: &str) {}

    /// Disables frame delivery, releases the retained frame and returns the
    /// runtime to its null state. Must be idempotent.
    fn teardown(&mut self);
}
