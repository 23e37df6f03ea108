//! Real-time playback of a clip on a background frame loop.
//!
//! All session state (lifecycle, time origin, pause position, target, last
//! emitted position, loop error) sits behind one mutex. A condition variable
//! on that mutex serves as the interruptible pacing sleep of the loop and as
//! the rendezvous for [`Runner::wait`]. Clips are rendered with the lock
//! released.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::clip::model::{Clip, ClipRef};
use crate::foundation::core::{ClipDuration, Frame, check_time};
use crate::foundation::error::{CueError, CueResult};
use crate::runner::clock::{Clock, MonotonicClock};
use crate::runner::config::RunnerConfig;

/// Transform applied to every rendered frame.
pub type ApplyFn<O> = dyn Fn(Frame) -> O + Send + Sync;
/// Sink invoked once per emitted frame, in playback order.
pub type OutputFn<O> = dyn Fn(&O) + Send + Sync;

/// Lifecycle of a [`Runner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Never played.
    Idle,
    Playing,
    Paused,
    /// Stopped by a caller, or aborted by a render error.
    Stopped,
    /// Reached the end of a finite target.
    Finished,
}

impl PlaybackState {
    /// `true` while a frame loop owns the session.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

struct Control<C> {
    state: PlaybackState,
    /// Bumped by every `play`; a loop thread exits once it no longer matches.
    session: u64,
    /// Clock reading that corresponds to playback position 0.
    origin: f64,
    paused_at: f64,
    /// Last emitted position.
    position: f64,
    emitted: bool,
    target: Option<ClipRef<C>>,
    error: Option<CueError>,
}

struct Shared<C, O> {
    ctx: C,
    apply: Box<ApplyFn<O>>,
    output: Box<OutputFn<O>>,
    config: RunnerConfig,
    clock: Arc<dyn Clock>,
    control: Mutex<Control<C>>,
    wake: Condvar,
}

impl<C, O> Shared<C, O> {
    fn lock(&self) -> MutexGuard<'_, Control<C>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, target: &dyn Clip<C>, t: f64) -> CueResult<O> {
        let frame = target.render(t, &self.ctx)?;
        let out = (self.apply)(frame);
        (self.output)(&out);
        Ok(out)
    }

    /// Playhead of a playing session at the current clock reading, clamped to
    /// the target's end and never behind the last emitted frame.
    fn live_position(&self, ctl: &Control<C>) -> f64 {
        let mut pos = (self.clock.now() - ctl.origin).max(0.0);
        if let Some(ClipDuration::Finite(d)) = ctl.target.as_ref().map(|t| t.duration()) {
            pos = pos.min(d);
        }
        if ctl.emitted {
            pos = pos.max(ctl.position);
        }
        pos
    }
}

/// Drives a clip in real time: clock -> position -> render -> apply -> output.
///
/// `C` is the render context handed to every clip, `O` is what `apply` turns
/// a frame into (the frame itself by default). A runner can be reused: every
/// [`Runner::play`] starts a fresh session and ends the previous one.
///
/// ```no_run
/// use std::sync::Arc;
/// use cuelist::{Runner, Timeline, clip_fn, Frame, Value};
///
/// let mut show = Timeline::new();
/// show.add(0.0, clip_fn(Some(2.0), |t, _: &()| {
///     Ok(Frame::from([("dim".to_owned(), Value::Number(t / 2.0))]))
/// })?)?;
///
/// let runner = Runner::builder(())
///     .fps(30.0)
///     .output(|frame: &Frame| println!("{frame:?}"))
///     .build()?;
/// runner.play_sync(Arc::new(show), 0.0)?;
/// # Ok::<(), cuelist::CueError>(())
/// ```
pub struct Runner<C = (), O = Frame> {
    shared: Arc<Shared<C, O>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<C> Runner<C, Frame>
where
    C: Send + Sync + 'static,
{
    /// Runner with default config, identity `apply` and no output.
    pub fn new(ctx: C) -> Self {
        Self::from_parts(
            ctx,
            RunnerConfig::default(),
            Arc::new(MonotonicClock::new()),
            Box::new(|frame: Frame| frame),
            Box::new(|_: &Frame| {}),
        )
    }

    pub fn builder(ctx: C) -> RunnerBuilder<C, Frame> {
        RunnerBuilder::new(ctx)
    }
}

impl<C, O> Runner<C, O>
where
    C: Send + Sync + 'static,
    O: 'static,
{
    fn from_parts(
        ctx: C,
        config: RunnerConfig,
        clock: Arc<dyn Clock>,
        apply: Box<ApplyFn<O>>,
        output: Box<OutputFn<O>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                ctx,
                apply,
                output,
                config,
                clock,
                control: Mutex::new(Control {
                    state: PlaybackState::Idle,
                    session: 0,
                    origin: 0.0,
                    paused_at: 0.0,
                    position: 0.0,
                    emitted: false,
                    target: None,
                    error: None,
                }),
                wake: Condvar::new(),
            }),
            thread: Mutex::new(None),
        }
    }

    pub fn ctx(&self) -> &C {
        &self.shared.ctx
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.shared.config
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    /// Current playback position in seconds. While playing this follows the
    /// clock; otherwise it is the position playback was paused or ended at.
    pub fn position(&self) -> f64 {
        let ctl = self.shared.lock();
        match ctl.state {
            PlaybackState::Playing => self.shared.live_position(&ctl),
            PlaybackState::Paused => ctl.paused_at,
            _ => ctl.position,
        }
    }

    /// Clip of the current (or last) session.
    pub fn target(&self) -> Option<ClipRef<C>> {
        self.shared.lock().target.clone()
    }

    /// Replace the clip of the running session; the next frame renders it.
    /// The playhead is kept.
    pub fn swap(&self, target: ClipRef<C>) {
        let mut ctl = self.shared.lock();
        ctl.target = Some(target);
        tracing::debug!(position = ctl.position, "playback target swapped");
    }

    /// Start playing `target` from `start_at` seconds on a background thread
    /// and return immediately. A running session is stopped first.
    pub fn play(&self, target: ClipRef<C>, start_at: f64) -> CueResult<()> {
        check_time(start_at, "start_at")?;
        self.stop();

        let session = {
            let mut ctl = self.shared.lock();
            ctl.session += 1;
            ctl.state = PlaybackState::Playing;
            ctl.origin = self.shared.clock.now() - start_at;
            ctl.paused_at = start_at;
            ctl.position = start_at;
            ctl.emitted = false;
            ctl.target = Some(target);
            ctl.error = None;
            ctl.session
        };
        tracing::debug!(start_at, fps = self.shared.config.fps, session, "playback started");

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("cuelist-runner".to_owned())
            .spawn(move || frame_loop(&shared, session));

        match spawned {
            Ok(handle) => {
                *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(())
            }
            Err(e) => {
                let mut ctl = self.shared.lock();
                ctl.state = PlaybackState::Stopped;
                self.shared.wake.notify_all();
                Err(anyhow::Error::new(e)
                    .context("failed to spawn frame loop thread")
                    .into())
            }
        }
    }

    /// [`Runner::play`] followed by [`Runner::wait`].
    pub fn play_sync(&self, target: ClipRef<C>, start_at: f64) -> CueResult<()> {
        self.play(target, start_at)?;
        self.wait()
    }

    /// Freeze the playhead. Returns `false` unless currently playing.
    pub fn pause(&self) -> bool {
        let mut ctl = self.shared.lock();
        if ctl.state != PlaybackState::Playing {
            return false;
        }
        ctl.paused_at = self.shared.live_position(&ctl);
        ctl.state = PlaybackState::Paused;
        self.shared.wake.notify_all();
        tracing::debug!(position = ctl.paused_at, "playback paused");
        true
    }

    /// Continue from the paused position. Returns `false` unless paused.
    pub fn resume(&self) -> bool {
        let mut ctl = self.shared.lock();
        if ctl.state != PlaybackState::Paused {
            return false;
        }
        ctl.origin = self.shared.clock.now() - ctl.paused_at;
        ctl.state = PlaybackState::Playing;
        self.shared.wake.notify_all();
        tracing::debug!(position = ctl.paused_at, "playback resumed");
        true
    }

    /// End the session and join its frame loop. Idempotent; when called from
    /// the loop thread itself (e.g. inside `output`) the join is skipped.
    pub fn stop(&self) {
        {
            let mut ctl = self.shared.lock();
            if ctl.state.is_active() {
                ctl.state = PlaybackState::Stopped;
                tracing::debug!(position = ctl.position, "playback stopped");
            }
            self.shared.wake.notify_all();
        }
        self.join_loop();
    }

    /// Block until the session is finished or stopped, then return the error
    /// that aborted the frame loop, if any. The error is handed out once.
    pub fn wait(&self) -> CueResult<()> {
        {
            let mut ctl = self.shared.lock();
            while ctl.state.is_active() {
                ctl = self
                    .shared
                    .wake
                    .wait(ctl)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        self.join_loop();
        match self.shared.lock().error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Render `target` at `t` with this runner's context. No apply, no output.
    pub fn render_frame(&self, target: &dyn Clip<C>, t: f64) -> CueResult<Frame> {
        target.render(t, &self.shared.ctx)
    }

    /// Render `target` at `t`, run it through `apply` and `output`, and return
    /// the applied value.
    pub fn tick(&self, target: &dyn Clip<C>, t: f64) -> CueResult<O> {
        self.shared.render(target, t)
    }

    /// Join the loop thread. On the loop thread itself the handle stays in
    /// place, so a later `wait`/`stop` from another thread still joins it.
    fn join_loop(&self) {
        let handle = {
            let mut slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
            if slot
                .as_ref()
                .is_some_and(|h| h.thread().id() == thread::current().id())
            {
                return;
            }
            slot.take()
        };
        let Some(handle) = handle else {
            return;
        };
        if handle.join().is_err() {
            tracing::error!("frame loop thread panicked");
        }
    }
}

impl<C, O> Drop for Runner<C, O> {
    fn drop(&mut self) {
        {
            let mut ctl = self.shared.lock();
            if ctl.state.is_active() {
                ctl.state = PlaybackState::Stopped;
            }
            self.shared.wake.notify_all();
        }
        let handle = self
            .thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && handle.thread().id() != thread::current().id()
        {
            let _ = handle.join();
        }
    }
}

impl<C, O> fmt::Debug for Runner<C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctl = self.shared.lock();
        f.debug_struct("Runner")
            .field("state", &ctl.state)
            .field("position", &ctl.position)
            .field("fps", &self.shared.config.fps)
            .finish_non_exhaustive()
    }
}

/// Marks the session stopped if its loop thread unwinds while still active.
struct SessionGuard<'a, C, O> {
    shared: &'a Shared<C, O>,
    session: u64,
}

impl<C, O> Drop for SessionGuard<'_, C, O> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let mut ctl = self.shared.lock();
        if ctl.session == self.session && ctl.state.is_active() {
            ctl.state = PlaybackState::Stopped;
            ctl.error = Some(CueError::playback(format!(
                "frame loop panicked at position {}",
                ctl.position
            )));
            self.shared.wake.notify_all();
        }
    }
}

/// Runs one session. Frames are paced against a fixed schedule (`anchor +
/// n * interval`) so render time and timer overshoot do not accumulate; a
/// late frame is followed by the next due one immediately. The schedule
/// restarts whenever playback resumes.
fn frame_loop<C, O>(shared: &Shared<C, O>, session: u64) {
    let _guard = SessionGuard { shared, session };
    let interval = shared.config.frame_interval();
    let mut anchor = Instant::now();
    let mut ticks: u32 = 0;
    let mut ctl = shared.lock();

    loop {
        if ctl.session != session {
            return;
        }
        match ctl.state {
            PlaybackState::Playing => {}
            PlaybackState::Paused => {
                ctl = shared.wake.wait(ctl).unwrap_or_else(PoisonError::into_inner);
                anchor = Instant::now();
                ticks = 0;
                continue;
            }
            _ => return,
        }
        let Some(target) = ctl.target.clone() else {
            ctl.state = PlaybackState::Stopped;
            shared.wake.notify_all();
            return;
        };

        let pos = shared.live_position(&ctl);
        if !ctl.emitted || pos > ctl.position {
            ctl.position = pos;
            ctl.emitted = true;
            drop(ctl);

            let rendered = shared.render(&*target, pos);

            ctl = shared.lock();
            if let Err(err) = rendered {
                if ctl.session == session && ctl.state.is_active() {
                    tracing::error!(position = pos, error = %err, "frame loop aborted");
                    ctl.state = PlaybackState::Stopped;
                    ctl.error = Some(err);
                    shared.wake.notify_all();
                } else {
                    tracing::warn!(
                        position = pos,
                        error = %err,
                        "render failed after session ended"
                    );
                }
                return;
            }
            if ctl.session != session || ctl.state != PlaybackState::Playing {
                continue;
            }
        }

        if target.duration().is_reached(ctl.position) {
            ctl.state = PlaybackState::Finished;
            shared.wake.notify_all();
            tracing::debug!(position = ctl.position, "playback finished");
            return;
        }

        ticks = ticks.saturating_add(1);
        let due = anchor + interval.saturating_mul(ticks);
        loop {
            let now = Instant::now();
            if now >= due {
                break;
            }
            let (guard, _) = shared
                .wake
                .wait_timeout(ctl, due - now)
                .unwrap_or_else(PoisonError::into_inner);
            ctl = guard;
            if ctl.session != session || ctl.state != PlaybackState::Playing {
                break;
            }
        }
    }
}

/// Configures a [`Runner`]: frame rate, clock, `apply` and `output`.
pub struct RunnerBuilder<C, O = Frame> {
    ctx: C,
    config: RunnerConfig,
    clock: Option<Arc<dyn Clock>>,
    apply: Box<ApplyFn<O>>,
    output: Box<OutputFn<O>>,
}

impl<C> RunnerBuilder<C, Frame> {
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            config: RunnerConfig::default(),
            clock: None,
            apply: Box::new(|frame: Frame| frame),
            output: Box::new(|_: &Frame| {}),
        }
    }
}

impl<C, O: 'static> RunnerBuilder<C, O> {
    pub fn fps(mut self, fps: f64) -> Self {
        self.config.fps = fps;
        self
    }

    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to a [`MonotonicClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the frame transform. Changes the output type, so any `output`
    /// set before is dropped.
    pub fn apply<P: 'static>(
        self,
        apply: impl Fn(Frame) -> P + Send + Sync + 'static,
    ) -> RunnerBuilder<C, P> {
        RunnerBuilder {
            ctx: self.ctx,
            config: self.config,
            clock: self.clock,
            apply: Box::new(apply),
            output: Box::new(|_: &P| {}),
        }
    }

    pub fn output(mut self, output: impl Fn(&O) + Send + Sync + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn build(self) -> CueResult<Runner<C, O>>
    where
        C: Send + Sync + 'static,
    {
        self.config.validate()?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Runner::from_parts(
            self.ctx,
            self.config,
            clock,
            self.apply,
            self.output,
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runner/player.rs"]
mod tests;
