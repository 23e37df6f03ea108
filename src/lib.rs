//! Cuelist arranges time-varying clips on timelines and plays them back.
//!
//! A [`Clip`] is a pure function of local time that renders a [`Frame`]
//! (key -> [`Value`]). A [`Timeline`] places clips at start times, merges
//! overlapping values per key through a [`Compose`] reduction, and is itself a
//! clip, so timelines nest. A [`BpmTimeline`] does the same in beats, bridged
//! to seconds by a shared [`TempoMap`].
//!
//! Two ways to drive a clip:
//!
//! - **Offline**: `render(t)` is deterministic, so any clip can be sampled at
//!   a fixed frame rate with [`render_range`] into a [`FrameSink`], optionally
//!   in parallel.
//! - **Live**: a [`Runner`] renders the clip against a [`Clock`] on a
//!   background thread, with pause/resume that never loses or rewinds the
//!   playhead.
//!
//! Rendered values are opaque to the engine; what a key means (a DMX channel,
//! an audio gain, ...) is up to the `apply`/`output` callbacks of the runner.
#![forbid(unsafe_code)]

mod clip;
mod composition;
mod foundation;
mod offline;
mod runner;
mod tempo;

pub use clip::ease::Ease;
pub use clip::model::{Clip, ClipRef, FnClip, clip_fn};
pub use clip::scaled::{ScaleFn, ScaledClip, fade_envelope, scale_numeric};
pub use composition::compose::{
    Compose, ComposeFn, compose_first, compose_last, compose_mean, compose_sum,
};
pub use composition::timeline::{Placement, Timeline};
pub use composition::verify::{Edge, VerifyPoint, collect_verify_points};
pub use foundation::core::{ClipDuration, Fps, Frame, FrameIndex, FrameRange, Value};
pub use foundation::error::{CueError, CueResult};
pub use offline::range::{OfflineOpts, RenderStats, clip_frame_range, render_range};
pub use offline::sink::{FrameSink, InMemorySink, JsonLinesSink, SinkConfig};
pub use runner::clock::{Clock, ManualClock, MonotonicClock};
pub use runner::config::{DEFAULT_FPS, RunnerConfig};
pub use runner::player::{ApplyFn, OutputFn, PlaybackState, Runner, RunnerBuilder};
pub use tempo::bpm::{BpmTimeline, NestedBpmClip};
pub use tempo::map::{DEFAULT_BPM, TempoChange, TempoMap};
