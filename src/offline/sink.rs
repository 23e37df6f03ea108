use std::io::Write;

use crate::foundation::core::{Fps, Frame, FrameIndex, FrameRange};
use crate::foundation::error::{CueError, CueResult};

/// Configuration provided to a [`FrameSink`] at the start of a range render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkConfig {
    /// Frame rate the range is sampled at.
    pub fps: Fps,
    /// Frames that will be pushed.
    pub range: FrameRange,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order within the
/// requested render range.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CueResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> CueResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> CueResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Frame)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in timeline order.
    pub fn frames(&self) -> &[(FrameIndex, Frame)] {
        &self.frames
    }

    /// Whether `end` was called after the last `begin`.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn into_frames(self) -> Vec<(FrameIndex, Frame)> {
        self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CueResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> CueResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> CueResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[derive(serde::Serialize)]
struct FrameLine<'a> {
    frame: u64,
    time: f64,
    values: &'a Frame,
}

/// Writes one JSON object per frame and line:
/// `{"frame":12,"time":0.3,"values":{...}}`.
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
    cfg: Option<SinkConfig>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, cfg: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn begin(&mut self, cfg: SinkConfig) -> CueResult<()> {
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> CueResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| CueError::config("JsonLinesSink::push_frame called before begin"))?;
        if !cfg.range.contains(idx) {
            return Err(CueError::config(format!(
                "frame {} is outside the configured range {}..{}",
                idx.0, cfg.range.start.0, cfg.range.end.0
            )));
        }
        let line = FrameLine {
            frame: idx.0,
            time: cfg.fps.frames_to_secs(idx.0),
            values: frame,
        };
        serde_json::to_writer(&mut self.out, &line)
            .map_err(|e| CueError::serde(format!("frame {}: {e}", idx.0)))?;
        self.out
            .write_all(b"\n")
            .map_err(|e| CueError::Other(anyhow::Error::new(e).context("write json line")))?;
        Ok(())
    }

    fn end(&mut self) -> CueResult<()> {
        self.out
            .flush()
            .map_err(|e| CueError::Other(anyhow::Error::new(e).context("flush json lines")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/offline/sink.rs"]
mod tests;
