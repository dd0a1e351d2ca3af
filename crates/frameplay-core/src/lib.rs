//! frameplay-core: runtime-agnostic half of the frameplay video engine.
//!
//! Everything here can be exercised without a media runtime:
//!
//! - Source handling: [`source`], [`probe`], [`resolution`], [`stream_params`]
//! - Pipeline planning: [`plan`]
//! - Playback: [`backend`], [`controller`], [`completion`], [`events`]
//! - Frame hand-off: [`frame_buffer`]
//! - Ambient: [`config`], [`error`]
//!
//! The GStreamer backend lives in the `frameplay` crate, which implements
//! [`backend::PipelineBackend`] and [`probe::CodecProbe`].

pub mod backend;
pub mod completion;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame_buffer;
pub mod plan;
pub mod probe;
pub mod resolution;
pub mod source;
pub mod stream_params;

pub use backend::{PipelineBackend, SeekMode, StateChange, TargetState};
pub use completion::CompletionTracker;
pub use config::PlayerConfig;
pub use controller::{PlaybackController, PlaybackState};
pub use error::{ErrorKind, PlayerError};
pub use events::{ChannelEvents, EventReceiver, PlayerEvent, PlayerEvents};
pub use frame_buffer::{FrameBuffer, FrameData, FrameView};
pub use plan::{PipelinePlan, Topology};
pub use probe::{CodecProbe, CodedSize, Inconsistency, NullProbe};
pub use source::{AspectRatio, FrameSize, SourceClassifier, SourceDescriptor, SourceKind};
pub use stream_params::StreamParams;
