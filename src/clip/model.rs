use std::sync::Arc;

use crate::composition::verify::VerifyPoint;
use crate::foundation::core::{ClipDuration, Frame};
use crate::foundation::error::CueResult;

/// Anything that produces a [`Frame`] from a local time offset.
///
/// `render` is a pure function of `t`: it must not keep per-call state, so the
/// same clip can be placed several times, nested in several timelines, or
/// rendered by several runners at once. `t` is only meaningful in
/// `[0, duration)`.
///
/// `C` is an opaque context threaded unchanged into every render call of a
/// playback session (fixture patches, scene handles, ...).
pub trait Clip<C = ()>: Send + Sync {
    /// Length of the clip in its local time unit.
    fn duration(&self) -> ClipDuration;

    /// Render the clip at local time `t`.
    fn render(&self, t: f64, ctx: &C) -> CueResult<Frame>;

    /// Verify points of the placements inside this clip, for clips that
    /// contain a timeline. `to_seconds` maps this clip's local time to
    /// absolute seconds. Leaf clips have none.
    fn nested_points(&self, _to_seconds: &dyn Fn(f64) -> f64) -> Vec<VerifyPoint> {
        Vec::new()
    }
}

/// Shared handle to a clip. Placements compare clips by pointer identity.
pub type ClipRef<C = ()> = Arc<dyn Clip<C>>;

/// A clip built from a duration and a plain closure. Created by [`clip_fn`].
pub struct FnClip<F> {
    duration: ClipDuration,
    render_fn: F,
}

impl<F> FnClip<F> {
    /// Wrap `render_fn`; `duration` is validated.
    pub fn new(duration: ClipDuration, render_fn: F) -> CueResult<Self> {
        duration.validate()?;
        Ok(Self {
            duration,
            render_fn,
        })
    }
}

impl<C, F> Clip<C> for FnClip<F>
where
    F: Fn(f64, &C) -> CueResult<Frame> + Send + Sync,
{
    fn duration(&self) -> ClipDuration {
        self.duration
    }

    fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        (self.render_fn)(t, ctx)
    }
}

/// Build a shared clip from an optional length (`None` = unbounded) and a
/// render closure.
///
/// ```
/// use cuelist::{Clip, Frame, Value, clip_fn};
///
/// let ramp = clip_fn(Some(2.0), |t, _: &()| {
///     Ok(Frame::from([("dim".to_owned(), Value::Number(t / 2.0))]))
/// })
/// .unwrap();
/// assert_eq!(ramp.render(1.0, &()).unwrap()["dim"], Value::Number(0.5));
/// ```
pub fn clip_fn<C, F>(duration: Option<f64>, render_fn: F) -> CueResult<ClipRef<C>>
where
    C: 'static,
    F: Fn(f64, &C) -> CueResult<Frame> + Send + Sync + 'static,
{
    let duration = match duration {
        Some(d) => ClipDuration::finite(d)?,
        None => ClipDuration::Unbounded,
    };
    Ok(Arc::new(FnClip::new(duration, render_fn)?))
}

#[cfg(test)]
#[path = "../../tests/unit/clip/model.rs"]
mod tests;
