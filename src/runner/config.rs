use std::time::Duration;

use crate::foundation::error::{CueError, CueResult};

/// Frame rate used when none is configured.
pub const DEFAULT_FPS: f64 = 40.0;

/// Live playback options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Target frames per second of the live frame loop. Best effort.
    pub fps: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}

impl RunnerConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> CueResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| CueError::config(format!("invalid runner config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CueResult<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(CueError::config(format!(
                "fps must be finite and > 0, got {}",
                self.fps
            )));
        }
        Ok(())
    }

    /// Pacing interval between frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runner/config.rs"]
mod tests;
