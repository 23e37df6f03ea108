use std::fmt;
use std::sync::Arc;

use crate::clip::ease::Ease;
use crate::clip::model::{Clip, ClipRef};
use crate::composition::verify::VerifyPoint;
use crate::foundation::core::{ClipDuration, Frame, Value};
use crate::foundation::error::{CueError, CueResult};

/// Scales a rendered frame by a factor in `(0, 1)`.
pub type ScaleFn = dyn Fn(Frame, f64) -> Frame + Send + Sync;

/// Linear fade-in/fade-out gain at local time `t`, in `[0, 1]`.
///
/// Returns `1.0` for unbounded or zero-length clips. Where the fade-in and
/// fade-out ramps overlap, the lower gain wins.
pub fn fade_envelope(t: f64, duration: ClipDuration, fade_in: f64, fade_out: f64) -> f64 {
    let ClipDuration::Finite(d) = duration else {
        return 1.0;
    };
    if d <= 0.0 {
        return 1.0;
    }

    let mut gain: f64 = 1.0;
    if fade_in > 0.0 {
        gain = gain.min(t / fade_in);
    }
    if fade_out > 0.0 {
        gain = gain.min((d - t) / fade_out);
    }
    gain.clamp(0.0, 1.0)
}

/// Multiply every `Number` and every `Vector` component by `factor`; other
/// values are left alone.
pub fn scale_numeric(frame: Frame, factor: f64) -> Frame {
    frame
        .into_iter()
        .map(|(key, value)| {
            let scaled = match value {
                Value::Number(n) => Value::Number(n * factor),
                Value::Vector(xs) => Value::Vector(xs.into_iter().map(|x| x * factor).collect()),
                other => other,
            };
            (key, scaled)
        })
        .collect()
}

fn check_non_negative(v: f64, what: &str) -> CueResult<f64> {
    if !v.is_finite() || v < 0.0 {
        return Err(CueError::invalid_duration(format!(
            "{what} must be finite and >= 0, got {v}"
        )));
    }
    Ok(v)
}

/// Wraps a clip with fades and a master amount.
///
/// The gain is `amount * ease(fade_envelope(..))`. At zero gain the clip
/// renders nothing. Below full gain the frame goes through the scale function
/// when one is set (see [`scale_numeric`]); without one the inner frame is
/// passed through unchanged, since only the caller knows how its values scale.
pub struct ScaledClip<C = ()> {
    inner: ClipRef<C>,
    fade_in: f64,
    fade_out: f64,
    amount: f64,
    ease: Ease,
    scale: Option<Arc<ScaleFn>>,
}

impl<C> ScaledClip<C> {
    /// Full amount, no fades, no scale function.
    pub fn new(inner: ClipRef<C>) -> Self {
        Self {
            inner,
            fade_in: 0.0,
            fade_out: 0.0,
            amount: 1.0,
            ease: Ease::Linear,
            scale: None,
        }
    }

    pub fn with_fades(mut self, fade_in: f64, fade_out: f64) -> CueResult<Self> {
        self.fade_in = check_non_negative(fade_in, "fade_in")?;
        self.fade_out = check_non_negative(fade_out, "fade_out")?;
        Ok(self)
    }

    pub fn with_amount(mut self, amount: f64) -> CueResult<Self> {
        self.amount = check_non_negative(amount, "amount")?;
        Ok(self)
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn with_scale(
        mut self,
        scale: impl Fn(Frame, f64) -> Frame + Send + Sync + 'static,
    ) -> Self {
        self.scale = Some(Arc::new(scale));
        self
    }

    pub fn inner(&self) -> &ClipRef<C> {
        &self.inner
    }

    pub fn fade_in(&self) -> f64 {
        self.fade_in
    }

    pub fn fade_out(&self) -> f64 {
        self.fade_out
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Gain applied at local time `t`.
    pub fn factor(&self, t: f64) -> f64 {
        let env = fade_envelope(t, self.inner.duration(), self.fade_in, self.fade_out);
        self.amount * self.ease.apply(env)
    }
}

impl<C> fmt::Debug for ScaledClip<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaledClip")
            .field("duration", &self.inner.duration())
            .field("fade_in", &self.fade_in)
            .field("fade_out", &self.fade_out)
            .field("amount", &self.amount)
            .field("ease", &self.ease)
            .field("scale", &self.scale.is_some())
            .finish()
    }
}

impl<C> Clip<C> for ScaledClip<C> {
    fn duration(&self) -> ClipDuration {
        self.inner.duration()
    }

    fn render(&self, t: f64, ctx: &C) -> CueResult<Frame> {
        let factor = self.factor(t);
        if factor <= 0.0 {
            return Ok(Frame::new());
        }
        let frame = self.inner.render(t, ctx)?;
        match &self.scale {
            Some(scale) if factor < 1.0 => Ok(scale(frame, factor)),
            _ => Ok(frame),
        }
    }

    fn nested_points(&self, to_seconds: &dyn Fn(f64) -> f64) -> Vec<VerifyPoint> {
        self.inner.nested_points(to_seconds)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/scaled.rs"]
mod tests;
