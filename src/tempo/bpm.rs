use std::sync::Arc;

use crate::clip::model::{Clip, ClipRef};
use crate::composition::compose::Compose;
use crate::composition::timeline::Timeline;
use crate::composition::verify::{VerifyPoint, collect_with};
use crate::foundation::core::{ClipDuration, Frame, check_time};
use crate::foundation::error::CueResult;
use crate::tempo::map::TempoMap;

/// A [`Timeline`] laid out in beats, rendered in seconds through a [`TempoMap`].
///
/// Placement starts and clip durations are beats; clips receive beat-local
/// time. As a [`Clip`] it reports its length in seconds, so it can be handed
/// to a runner or placed on a second-based timeline directly. To nest it in
/// another beat timeline, wrap it in a [`NestedBpmClip`].
///
/// The tempo map is shared: several beat timelines can follow the same map,
/// and [`BpmTimeline::tempo_map_mut`] copies it on write.
pub struct BpmTimeline<C = ()> {
    inner: Timeline<C>,
    tempo: Arc<TempoMap>,
}

impl<C> Default for BpmTimeline<C> {
    fn default() -> Self {
        Self::new(Arc::new(TempoMap::default()))
    }
}

impl<C> Clone for BpmTimeline<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tempo: Arc::clone(&self.tempo),
        }
    }
}

impl<C> BpmTimeline<C> {
    pub fn new(tempo: Arc<TempoMap>) -> Self {
        Self::with_compose(tempo, Compose::default())
    }

    pub fn with_compose(tempo: Arc<TempoMap>, compose: Compose) -> Self {
        Self {
            inner: Timeline::with_compose(compose),
            tempo,
        }
    }

    /// Place `clip` at `beat`.
    pub fn add(&mut self, beat: f64, clip: ClipRef<C>) -> CueResult<&mut Self> {
        self.inner.add(beat, clip)?;
        Ok(self)
    }

    pub fn add_labeled(
        &mut self,
        beat: f64,
        label: impl Into<String>,
        clip: ClipRef<C>,
    ) -> CueResult<&mut Self> {
        self.inner.add_labeled(beat, label, clip)?;
        Ok(self)
    }

    /// See [`Timeline::remove`].
    pub fn remove(&mut self, beat: f64, clip: &ClipRef<C>) -> CueResult<&mut Self> {
        self.inner.remove(beat, clip)?;
        Ok(self)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.inner.clear();
        self
    }

    /// Beat-indexed placements.
    pub fn timeline(&self) -> &Timeline<C> {
        &self.inner
    }

    pub fn tempo_map(&self) -> &Arc<TempoMap> {
        &self.tempo
    }

    pub fn set_tempo_map(&mut self, tempo: Arc<TempoMap>) -> &mut Self {
        self.tempo = tempo;
        self
    }

    /// Mutable tempo map; detaches from other holders of the shared map.
    pub fn tempo_map_mut(&mut self) -> &mut TempoMap {
        Arc::make_mut(&mut self.tempo)
    }

    /// End of the last clip in beats.
    pub fn duration_beats(&self) -> ClipDuration {
        self.inner.duration()
    }

    /// End of the last clip in seconds under the current tempo map.
    pub fn duration_seconds(&self) -> ClipDuration {
        match self.inner.duration() {
            ClipDuration::Finite(beats) => ClipDuration::Finite(self.tempo.seconds_at(beats)),
            ClipDuration::Unbounded => ClipDuration::Unbounded,
        }
    }

    /// Render at `t` seconds; clips see the beat position.
    pub fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        check_time(t, "render time")?;
        let beat = self.tempo.beat_at(t);
        tracing::trace!(seconds = t, beat, "beat timeline render");
        self.inner.render(beat, ctx)
    }

    /// Verify points with beat positions converted to seconds.
    pub fn verify_points(&self) -> Vec<VerifyPoint> {
        collect_with(self.inner.placements(), &|beat| self.tempo.seconds_at(beat))
    }
}

impl<C> Clip<C> for BpmTimeline<C> {
    fn duration(&self) -> ClipDuration {
        self.duration_seconds()
    }

    fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        BpmTimeline::render(self, t, ctx)
    }

    fn nested_points(&self, to_seconds: &dyn Fn(f64) -> f64) -> Vec<VerifyPoint> {
        collect_with(self.inner.placements(), &|beat| to_seconds(self.tempo.seconds_at(beat)))
    }
}

/// Beat-space view of a [`BpmTimeline`] for placing it inside another beat
/// timeline: duration is in beats and `render` takes beats, bypassing the
/// inner tempo map.
pub struct NestedBpmClip<C = ()> {
    timeline: Arc<BpmTimeline<C>>,
}

impl<C> NestedBpmClip<C> {
    pub fn new(timeline: Arc<BpmTimeline<C>>) -> Self {
        Self { timeline }
    }

    pub fn timeline(&self) -> &Arc<BpmTimeline<C>> {
        &self.timeline
    }
}

impl<C> Clip<C> for NestedBpmClip<C> {
    fn duration(&self) -> ClipDuration {
        self.timeline.duration_beats()
    }

    fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        self.timeline.inner.render(t, ctx)
    }

    fn nested_points(&self, to_seconds: &dyn Fn(f64) -> f64) -> Vec<VerifyPoint> {
        collect_with(self.timeline.inner.placements(), to_seconds)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tempo/bpm.rs"]
mod tests;
