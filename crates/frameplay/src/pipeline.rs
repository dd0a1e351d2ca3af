//! GStreamer pipeline construction and control.
//!
//! [`GstPipeline::build`] turns a [`PipelinePlan`] into a linked element
//! graph:
//!
//! ```text
//! playbin3 topology:
//!   pipeline ── playbin3 "src" (uri, video-sink = "output" bin)
//!                 └── output: ghost "sink" → converter → capsfilter → appsink
//!
//! camera topology:
//!   pipeline ── v4l2src "src" (device) → converter → capsfilter → appsink
//! ```
//!
//! End-of-stream, warnings and errors are handled on the bus sync handler,
//! i.e. on whichever thread posted them. Frames arrive on the appsink
//! streaming thread and go straight into the shared [`FrameBuffer`].

use std::str::FromStr;
use std::sync::Arc;

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;

use frameplay_core::{
    CompletionTracker, FrameBuffer, FrameData, FrameSize, PipelineBackend, PipelinePlan,
    PlayerError, PlayerEvents, SeekMode, StateChange, TargetState, Topology,
};

use crate::runtime;

/// A decoded RGBA buffer as handed over by the appsink.
pub struct GstFrame(gst::Buffer);

impl FrameData for GstFrame {
    fn byte_len(&self) -> usize {
        self.0.size()
    }

    fn copy_to(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.0.size());
        match self.0.copy_to_slice(0, &mut dst[..n]) {
            Ok(()) => n,
            Err(copied) => copied,
        }
    }
}

/// Reads `width`/`height` from the first caps structure.
pub fn caps_size(caps: &gst::CapsRef) -> Option<FrameSize> {
    let s = caps.structure(0)?;
    let width = u32::try_from(s.get::<i32>("width").ok()?).ok()?;
    let height = u32::try_from(s.get::<i32>("height").ok()?).ok()?;
    Some(FrameSize::new(width, height))
}

fn make_element(factory: &str, name: &str) -> Result<gst::Element, PlayerError> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|e| PlayerError::Allocation(format!("Failed to create {factory}: {e}")))
}

fn link_error(what: &str) -> impl Fn(glib::BoolError) -> PlayerError + '_ {
    move |e| PlayerError::Link(format!("{what}: {e}"))
}

fn handle_bus_message(msg: &gst::Message, completion: &CompletionTracker) {
    let source = msg
        .src()
        .map(|s| s.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match msg.view() {
        gst::MessageView::Eos(_) => {
            tracing::debug!("End of stream from {source}");
            completion.signal();
        }
        gst::MessageView::Warning(w) => {
            tracing::warn!("Warning from {source}: {} ({:?})", w.error(), w.debug());
        }
        gst::MessageView::Error(err) => {
            tracing::error!("Error from {source}: {} ({:?})", err.error(), err.debug());
        }
        _ => {}
    }
}

/// Built, linked pipeline owned by a playback controller.
pub struct GstPipeline {
    pipeline: gst::Pipeline,
    source: gst::Element,
    appsink: gst_app::AppSink,
    frames: Arc<FrameBuffer<GstFrame>>,
    torn_down: bool,
}

// The controller moves its backend across threads with the player.
const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<GstPipeline>();
};

impl GstPipeline {
    /// Allocates and links every element named by `plan`, then points the
    /// source at `location` (a URI, or a device path for cameras).
    ///
    /// On failure everything allocated so far is released before returning.
    pub fn build(
        plan: &PipelinePlan,
        location: &str,
        frames: Arc<FrameBuffer<GstFrame>>,
        completion: Arc<CompletionTracker>,
        events: Arc<dyn PlayerEvents>,
    ) -> Result<Self, PlayerError> {
        runtime::init()?;
        if plan.hardware {
            runtime::boost_hardware_ranks();
        }

        let pipeline = gst::Pipeline::with_name("pipeline");
        match Self::assemble(&pipeline, plan, location, &frames, completion, events) {
            Ok((source, appsink)) => {
                tracing::info!(
                    "Built {} pipeline with {} for {location} (caps {})",
                    plan.source_element,
                    plan.converter,
                    plan.caps
                );
                Ok(Self {
                    pipeline,
                    source,
                    appsink,
                    frames,
                    torn_down: false,
                })
            }
            Err(e) => {
                tracing::error!("Failed to build pipeline for {location}: {e}");
                if let Some(bus) = pipeline.bus() {
                    bus.unset_sync_handler();
                }
                let _ = pipeline.set_state(gst::State::Null);
                Err(e)
            }
        }
    }

    fn assemble(
        pipeline: &gst::Pipeline,
        plan: &PipelinePlan,
        location: &str,
        frames: &Arc<FrameBuffer<GstFrame>>,
        completion: Arc<CompletionTracker>,
        events: Arc<dyn PlayerEvents>,
    ) -> Result<(gst::Element, gst_app::AppSink), PlayerError> {
        let source = make_element(plan.source_element, "src")?;
        let converter = make_element(plan.converter, "videoconvert")?;

        let caps = gst::Caps::from_str(&plan.caps)
            .map_err(|e| PlayerError::Allocation(format!("Invalid caps {}: {e}", plan.caps)))?;
        let filter = gst::ElementFactory::make("capsfilter")
            .name("filter")
            .property("caps", &caps)
            .build()
            .map_err(|e| PlayerError::Allocation(format!("Failed to create capsfilter: {e}")))?;

        // Latest frame only; stale frames are dropped rather than queued.
        let appsink = gst_app::AppSink::builder()
            .name("videosink")
            .sync(true)
            .qos(true)
            .max_buffers(1)
            .drop(true)
            .build();

        let bus = pipeline
            .bus()
            .ok_or_else(|| PlayerError::Allocation("Pipeline has no bus".to_string()))?;
        bus.set_sync_handler(move |_, msg| {
            handle_bus_message(msg, &completion);
            // Nothing pops the async queue.
            gst::BusSyncReply::Drop
        });

        let sink_frames = Arc::clone(frames);
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let Some(buffer) = sample.buffer_owned() else {
                        return Err(gst::FlowError::Error);
                    };
                    let size = sample
                        .caps()
                        .and_then(caps_size)
                        .unwrap_or_else(|| sink_frames.size());
                    if sink_frames.deliver(GstFrame(buffer), size) {
                        events.on_frame_decoded();
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        if plan.letterbox && converter.find_property("add-borders").is_some() {
            converter.set_property("add-borders", true);
        }

        match plan.topology {
            Topology::PlaybackBin => {
                let output = gst::Bin::with_name("output");
                output
                    .add_many([&converter, &filter, appsink.upcast_ref()])
                    .map_err(link_error("Failed to add elements to the output bin"))?;
                gst::Element::link_many([&converter, &filter, appsink.upcast_ref()])
                    .map_err(link_error("Failed to link the output bin"))?;

                let sink_pad = converter.static_pad("sink").ok_or_else(|| {
                    PlayerError::Link(format!("{} has no sink pad", plan.converter))
                })?;
                let ghost = gst::GhostPad::with_target(&sink_pad)
                    .map_err(link_error("Failed to create ghost pad"))?;
                ghost
                    .set_active(true)
                    .map_err(link_error("Failed to activate ghost pad"))?;
                output
                    .add_pad(&ghost)
                    .map_err(link_error("Failed to add ghost pad"))?;

                source.set_property("video-sink", &output);
                pipeline
                    .add(&source)
                    .map_err(link_error("Failed to add source to pipeline"))?;
            }
            Topology::Direct => {
                pipeline
                    .add_many([&source, &converter, &filter, appsink.upcast_ref()])
                    .map_err(link_error("Failed to add elements to pipeline"))?;
                gst::Element::link_many([&source, &converter, &filter, appsink.upcast_ref()])
                    .map_err(link_error("Failed to link elements"))?;
            }
        }

        let property = plan.source_property();
        if source.find_property(property).is_none() {
            return Err(PlayerError::Link(format!(
                "{} has no {property} property",
                plan.source_element
            )));
        }
        source.set_property(property, location);

        Ok((source, appsink))
    }
}

impl PipelineBackend for GstPipeline {
    type Frame = GstFrame;

    fn request_state(&self, target: TargetState) -> Result<StateChange, PlayerError> {
        let state = match target {
            TargetState::Ready => gst::State::Ready,
            TargetState::Paused => gst::State::Paused,
            TargetState::Playing => gst::State::Playing,
        };
        match self.pipeline.set_state(state) {
            Ok(gst::StateChangeSuccess::Success) => Ok(StateChange::Success),
            Ok(gst::StateChangeSuccess::Async) => Ok(StateChange::Async),
            Ok(gst::StateChangeSuccess::NoPreroll) => Ok(StateChange::NoPreroll),
            Err(e) => Err(PlayerError::StateTransition(format!("{state:?}: {e}"))),
        }
    }

    fn wait_for_state(&self) -> Result<(), PlayerError> {
        let (result, current, pending) = self.pipeline.state(gst::ClockTime::NONE);
        tracing::debug!("Pipeline state settled: {current:?} (pending {pending:?})");
        result
            .map(|_| ())
            .map_err(|e| PlayerError::StateTransition(format!("{current:?}: {e}")))
    }

    fn seek(&self, rate: f64, position_ms: i64, mode: SeekMode) -> Result<(), PlayerError> {
        let flags = match mode {
            SeekMode::Flush => gst::SeekFlags::FLUSH,
            SeekMode::FlushKeyUnit => gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
        };
        let start = gst::ClockTime::from_mseconds(u64::try_from(position_ms).unwrap_or(0));
        self.pipeline
            .seek(
                rate,
                flags,
                gst::SeekType::Set,
                Some(start),
                gst::SeekType::Set,
                gst::ClockTime::NONE,
            )
            .map_err(|e| PlayerError::StateTransition(format!("Seek to {position_ms}ms: {e}")))
    }

    fn duration_ms(&self) -> Option<i64> {
        let duration = self.pipeline.query_duration::<gst::ClockTime>()?;
        i64::try_from(duration.mseconds()).ok()
    }

    fn position_ms(&self) -> Option<i64> {
        let position = self.pipeline.query_position::<gst::ClockTime>()?;
        i64::try_from(position.mseconds()).ok()
    }

    fn set_volume(&self, volume: f64) -> Option<f64> {
        let pspec = self.source.find_property("volume")?;
        let range = pspec.downcast_ref::<glib::ParamSpecDouble>()?;
        let volume = volume.clamp(range.minimum(), range.maximum());
        self.source.set_property("volume", volume);
        Some(volume)
    }

    fn set_mute(&self, mute: bool) {
        if self.source.find_property("mute").is_some() {
            self.source.set_property("mute", mute);
        }
    }

    fn video_size(&self) -> Option<FrameSize> {
        let caps = self.appsink.static_pad("sink")?.current_caps()?;
        caps_size(&caps)
    }

    fn dump_graph(&self, name: &str) {
        // Written only when GST_DEBUG_DUMP_DOT_DIR is set.
        self.pipeline.debug_to_dot_file(gst::DebugGraphDetails::all(), name);
        tracing::debug!("Requested pipeline graph dump {name}.dot");
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.frames.shutdown();
        if let Some(bus) = self.pipeline.bus() {
            bus.unset_sync_handler();
        }
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!("Failed to set pipeline to NULL: {e}");
        }
        tracing::debug!("Pipeline torn down");
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}
