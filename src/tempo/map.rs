use crate::foundation::core::check_time;
use crate::foundation::error::{CueError, CueResult};

/// Tempo used by [`TempoMap::default`].
pub const DEFAULT_BPM: f64 = 120.0;

/// A tempo breakpoint: from `beat` on, the tempo is `bpm` until the next one.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TempoChange {
    pub beat: f64,
    pub bpm: f64,
}

/// Piecewise-constant tempo over beat space.
///
/// Breakpoints are kept strictly ascending by beat and there is always one at
/// beat 0, so every non-negative beat has exactly one governing tempo.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            changes: vec![TempoChange {
                beat: 0.0,
                bpm: DEFAULT_BPM,
            }],
        }
    }
}

fn check_bpm(bpm: f64) -> CueResult<f64> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(CueError::invalid_tempo(format!(
            "bpm must be finite and > 0, got {bpm}"
        )));
    }
    Ok(bpm)
}

impl TempoMap {
    /// Constant tempo starting at beat 0.
    pub fn new(bpm: f64) -> CueResult<Self> {
        Ok(Self {
            changes: vec![TempoChange {
                beat: 0.0,
                bpm: check_bpm(bpm)?,
            }],
        })
    }

    /// Insert a breakpoint, or replace the one already at `beat`.
    pub fn set_tempo(&mut self, beat: f64, bpm: f64) -> CueResult<&mut Self> {
        let bpm = check_bpm(bpm)?;
        check_time(beat, "tempo change beat")?;

        match self
            .changes
            .binary_search_by(|c| c.beat.total_cmp(&beat))
        {
            Ok(i) => self.changes[i].bpm = bpm,
            Err(i) => self.changes.insert(i, TempoChange { beat, bpm }),
        }
        tracing::trace!(beat, bpm, breakpoints = self.changes.len(), "tempo change set");
        Ok(self)
    }

    /// Breakpoints in ascending beat order; the first is always at beat 0.
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// Tempo in effect at `beat`.
    pub fn tempo_at(&self, beat: f64) -> f64 {
        self.changes
            .iter()
            .rev()
            .find(|c| c.beat <= beat)
            .unwrap_or(&self.changes[0])
            .bpm
    }

    /// Seconds elapsed from beat 0 to `beat`.
    pub fn time(&self, beat: f64) -> CueResult<f64> {
        check_time(beat, "beat")?;
        Ok(self.seconds_at(beat))
    }

    /// Beat position reached after `seconds` from beat 0.
    pub fn beat(&self, seconds: f64) -> CueResult<f64> {
        check_time(seconds, "seconds")?;
        Ok(self.beat_at(seconds))
    }

    /// [`TempoMap::time`] for callers that already hold a non-negative beat.
    pub(crate) fn seconds_at(&self, beat: f64) -> f64 {
        let mut total = 0.0;
        for (i, c) in self.changes.iter().enumerate() {
            match self.changes.get(i + 1) {
                Some(next) if beat > next.beat => {
                    total += (next.beat - c.beat) / c.bpm * 60.0;
                }
                _ => {
                    total += (beat - c.beat) / c.bpm * 60.0;
                    break;
                }
            }
        }
        total
    }

    pub(crate) fn beat_at(&self, seconds: f64) -> f64 {
        let mut elapsed = 0.0;
        for (i, c) in self.changes.iter().enumerate() {
            if let Some(next) = self.changes.get(i + 1) {
                let segment = (next.beat - c.beat) / c.bpm * 60.0;
                if elapsed + segment < seconds {
                    elapsed += segment;
                    continue;
                }
            }
            return c.beat + (seconds - elapsed) * c.bpm / 60.0;
        }
        unreachable!("tempo map always holds a breakpoint at beat 0")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tempo/map.rs"]
mod tests;
