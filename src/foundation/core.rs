use std::collections::BTreeMap;

use crate::foundation::error::{CueError, CueResult};

/// One rendered value. Opaque to the engine apart from the numeric reducers.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Scalar level, intensity, gain, ...
    Number(f64),
    /// On/off switches.
    Bool(bool),
    /// Free-form text (cue names, presets, ...).
    Text(String),
    /// Fixed-width numeric tuples (colors, positions, ...).
    Vector(Vec<f64>),
}

impl Value {
    /// Numeric payload, if this is a [`Value::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

/// Rendered output of a clip at one instant: key -> value, in key order.
pub type Frame = BTreeMap<String, Value>;

/// Length of a clip in its own time unit (seconds, or beats on a beat timeline).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ClipDuration {
    /// Ends at this local time (exclusive).
    Finite(f64),
    /// Never ends.
    Unbounded,
}

impl ClipDuration {
    /// Validated finite duration.
    pub fn finite(length: f64) -> CueResult<Self> {
        let d = Self::Finite(length);
        d.validate()?;
        Ok(d)
    }

    /// Reject negative or non-finite lengths.
    pub fn validate(self) -> CueResult<()> {
        match self {
            Self::Finite(d) if !d.is_finite() || d < 0.0 => Err(CueError::invalid_duration(
                format!("clip duration must be finite and >= 0, got {d}"),
            )),
            _ => Ok(()),
        }
    }

    /// Finite length, or `None` when unbounded.
    pub fn as_finite(self) -> Option<f64> {
        match self {
            Self::Finite(d) => Some(d),
            Self::Unbounded => None,
        }
    }

    /// Whether this is [`ClipDuration::Unbounded`].
    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// `true` when `local_t` falls inside `[0, duration)`.
    pub fn contains(self, local_t: f64) -> bool {
        if local_t < 0.0 {
            return false;
        }
        match self {
            Self::Finite(d) => local_t < d,
            Self::Unbounded => true,
        }
    }

    /// `true` when a playhead at `position` has reached the end.
    pub fn is_reached(self, position: f64) -> bool {
        match self {
            Self::Finite(d) => position >= d,
            Self::Unbounded => false,
        }
    }
}

/// Reject negative or non-finite time arguments.
pub(crate) fn check_time(t: f64, what: &str) -> CueResult<f64> {
    if !t.is_finite() || t < 0.0 {
        return Err(CueError::invalid_time(format!(
            "{what} must be finite and >= 0, got {t}"
        )));
    }
    Ok(t)
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    pub fn new(start: FrameIndex, end: FrameIndex) -> CueResult<Self> {
        if start.0 > end.0 {
            return Err(CueError::config("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> CueResult<Self> {
        if den == 0 {
            return Err(CueError::config("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(CueError::config("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        (secs * self.as_f64()).ceil().max(0.0) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
