use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clip::model::{Clip, ClipRef};
use crate::composition::compose::Compose;
use crate::composition::verify::{VerifyPoint, collect_with};
use crate::foundation::core::{ClipDuration, Frame, Value, check_time};
use crate::foundation::error::{CueError, CueResult};

/// One clip placed on a timeline.
pub struct Placement<C = ()> {
    start: f64,
    clip: ClipRef<C>,
    label: Option<String>,
}

impl<C> Placement<C> {
    /// Start position in the owning timeline's time unit.
    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn clip(&self) -> &ClipRef<C> {
        &self.clip
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Local time of this placement at timeline time `t`, if the clip is active.
    fn local_time(&self, t: f64) -> Option<f64> {
        let local = t - self.start;
        (self.start <= t && self.clip.duration().contains(local)).then_some(local)
    }
}

impl<C> Clone for Placement<C> {
    fn clone(&self) -> Self {
        Self {
            start: self.start,
            clip: Arc::clone(&self.clip),
            label: self.label.clone(),
        }
    }
}

/// Insertion-ordered clip placements merged through one [`Compose`] reduction.
///
/// When several active clips write the same key, their values reach the
/// reduction in the order the placements were added, regardless of start
/// time. A timeline is itself a [`Clip`], so timelines nest.
pub struct Timeline<C = ()> {
    placements: Vec<Placement<C>>,
    compose: Compose,
}

impl<C> Default for Timeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Timeline<C> {
    fn clone(&self) -> Self {
        Self {
            placements: self.placements.clone(),
            compose: self.compose.clone(),
        }
    }
}

impl<C> Timeline<C> {
    /// Empty timeline composing with [`Compose::Last`].
    pub fn new() -> Self {
        Self::with_compose(Compose::default())
    }

    pub fn with_compose(compose: Compose) -> Self {
        Self {
            placements: Vec::new(),
            compose,
        }
    }

    pub fn compose(&self) -> &Compose {
        &self.compose
    }

    pub fn set_compose(&mut self, compose: Compose) -> &mut Self {
        self.compose = compose;
        self
    }

    /// Place `clip` at `start`.
    pub fn add(&mut self, start: f64, clip: ClipRef<C>) -> CueResult<&mut Self> {
        self.push(start, clip, None)
    }

    /// Place `clip` at `start` with a label used by verify points.
    pub fn add_labeled(
        &mut self,
        start: f64,
        label: impl Into<String>,
        clip: ClipRef<C>,
    ) -> CueResult<&mut Self> {
        self.push(start, clip, Some(label.into()))
    }

    fn push(
        &mut self,
        start: f64,
        clip: ClipRef<C>,
        label: Option<String>,
    ) -> CueResult<&mut Self> {
        check_time(start, "placement start")?;
        clip.duration().validate()?;
        self.placements.push(Placement { start, clip, label });
        Ok(self)
    }

    /// Remove the first placement at exactly `start` holding this same clip
    /// (pointer identity). Fails with [`CueError::NotFound`] when absent.
    pub fn remove(&mut self, start: f64, clip: &ClipRef<C>) -> CueResult<&mut Self> {
        let idx = self
            .placements
            .iter()
            .position(|p| p.start == start && Arc::ptr_eq(&p.clip, clip))
            .ok_or_else(|| CueError::not_found(format!("no placement of that clip at {start}")))?;
        self.placements.remove(idx);
        Ok(self)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.placements.clear();
        self
    }

    pub fn placements(&self) -> &[Placement<C>] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// End of the last placed clip, `Unbounded` if any clip never ends, `0.0`
    /// when empty.
    pub fn duration(&self) -> ClipDuration {
        let mut end = 0.0_f64;
        for p in &self.placements {
            match p.clip.duration() {
                ClipDuration::Finite(d) => end = end.max(p.start + d),
                ClipDuration::Unbounded => return ClipDuration::Unbounded,
            }
        }
        ClipDuration::Finite(end)
    }

    /// Earliest placement start, `0.0` when empty.
    pub fn start(&self) -> f64 {
        self.placements
            .iter()
            .map(|p| p.start)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Render every active placement at `t` and merge values per key.
    #[tracing::instrument(
        level = "trace",
        skip(self, ctx),
        fields(placements = self.placements.len())
    )]
    pub fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        check_time(t, "render time")?;

        let mut per_key: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for p in &self.placements {
            let Some(local) = p.local_time(t) else {
                continue;
            };
            for (key, value) in p.clip.render(local, ctx)? {
                per_key.entry(key).or_default().push(value);
            }
        }

        per_key
            .into_iter()
            .map(|(key, values)| match self.compose.apply(&values) {
                Ok(v) => Ok((key, v)),
                Err(CueError::CompositionMismatch(msg)) => {
                    Err(CueError::composition(format!("key '{key}': {msg}")))
                }
                Err(e) => Err(e),
            })
            .collect()
    }
}

impl<C> Clip<C> for Timeline<C> {
    fn duration(&self) -> ClipDuration {
        Timeline::duration(self)
    }

    fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        Timeline::render(self, t, ctx)
    }

    fn nested_points(&self, to_seconds: &dyn Fn(f64) -> f64) -> Vec<VerifyPoint> {
        collect_with(&self.placements, to_seconds)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/timeline.rs"]
mod tests;
