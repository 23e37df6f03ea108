use rayon::prelude::*;

use crate::clip::model::Clip;
use crate::foundation::core::{ClipDuration, Fps, Frame, FrameIndex, FrameRange};
use crate::foundation::error::{CueError, CueResult};
use crate::offline::sink::{FrameSink, SinkConfig};

/// Options for [`render_range`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OfflineOpts {
    /// Render frames of each chunk in parallel on a dedicated rayon pool.
    pub parallel: bool,
    /// Frames rendered per chunk before they are handed to the sink.
    pub chunk_size: usize,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for OfflineOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub chunks: u64,
}

/// Frames `[0, ceil(duration * fps))` covering a finite clip.
pub fn clip_frame_range<C>(clip: &dyn Clip<C>, fps: Fps) -> CueResult<FrameRange> {
    match clip.duration() {
        ClipDuration::Finite(d) => {
            FrameRange::new(FrameIndex(0), FrameIndex(fps.secs_to_frames_ceil(d)))
        }
        ClipDuration::Unbounded => Err(CueError::config(
            "an unbounded clip needs an explicit frame range",
        )),
    }
}

/// Render `range` of `clip` sampled at `fps` and stream the frames into `sink`.
///
/// Frame `i` is rendered at `i / fps` seconds. The sink receives frames in
/// strictly increasing index order; with `parallel` enabled, each chunk is
/// rendered out of order on the pool and handed over in order, so output is
/// identical to a sequential render.
pub fn render_range<C: Sync>(
    clip: &dyn Clip<C>,
    ctx: &C,
    fps: Fps,
    range: FrameRange,
    opts: &OfflineOpts,
    sink: &mut dyn FrameSink,
) -> CueResult<RenderStats> {
    if range.is_empty() {
        return Err(CueError::config("render_range range must be non-empty"));
    }

    let pool = if opts.parallel {
        Some(build_thread_pool(opts.threads)?)
    } else {
        None
    };
    let chunk_size = normalized_chunk_size(opts.chunk_size);

    tracing::debug!(
        start = range.start.0,
        end = range.end.0,
        frames = range.len_frames(),
        fps = fps.as_f64(),
        parallel = opts.parallel,
        chunk_size,
        "offline render started"
    );

    sink.begin(SinkConfig { fps, range })?;

    let mut stats = RenderStats::default();
    let mut chunk_start = range.start.0;
    while chunk_start < range.end.0 {
        let chunk_end = (chunk_start + chunk_size).min(range.end.0);
        let render_one = |f: u64| clip.render(fps.frames_to_secs(f), ctx);

        let frames: Vec<Frame> = match pool.as_ref() {
            Some(pool) => pool.install(|| {
                (chunk_start..chunk_end)
                    .into_par_iter()
                    .map(render_one)
                    .collect::<CueResult<Vec<_>>>()
            })?,
            None => (chunk_start..chunk_end)
                .map(render_one)
                .collect::<CueResult<Vec<_>>>()?,
        };

        for (f, frame) in (chunk_start..chunk_end).zip(&frames) {
            sink.push_frame(FrameIndex(f), frame)?;
        }
        stats.frames_total += chunk_end - chunk_start;
        stats.chunks += 1;
        chunk_start = chunk_end;
    }

    sink.end()?;
    tracing::debug!(frames = stats.frames_total, chunks = stats.chunks, "offline render finished");
    Ok(stats)
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

fn build_thread_pool(threads: Option<usize>) -> CueResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CueError::config(
            "render_range 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CueError::config(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/offline/range.rs"]
mod tests;
