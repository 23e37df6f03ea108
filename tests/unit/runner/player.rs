use super::*;
use crate::clip::model::clip_fn;
use crate::foundation::core::Value;
use crate::runner::clock::ManualClock;
use std::time::{Duration, Instant};

/// Emits its local time under "t".
fn probe(length: Option<f64>) -> ClipRef {
    clip_fn(length, |t, _: &()| {
        Ok(Frame::from([("t".to_owned(), Value::Number(t))]))
    })
    .unwrap()
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

type Seen = Arc<Mutex<Vec<f64>>>;

/// Runner on a manual clock that records every emitted "t".
fn recording_runner(clock: &Arc<ManualClock>) -> (Runner<(), f64>, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let runner = Runner::builder(())
        .fps(200.0)
        .clock(Arc::clone(clock) as Arc<dyn Clock>)
        .apply(|frame: Frame| frame.get("t").and_then(Value::as_number).unwrap_or(f64::NAN))
        .output(move |t: &f64| sink.lock().unwrap().push(*t))
        .build()
        .unwrap();
    (runner, seen)
}

fn snapshot(seen: &Seen) -> Vec<f64> {
    seen.lock().unwrap().clone()
}

#[test]
fn new_runner_is_idle() {
    let runner = Runner::new(());
    assert_eq!(runner.state(), PlaybackState::Idle);
    assert_eq!(runner.position(), 0.0);
    assert!(runner.target().is_none());
    assert_eq!(runner.config().fps, 40.0);
    runner.wait().unwrap();
}

#[test]
fn builder_rejects_bad_fps() {
    assert!(matches!(
        Runner::builder(()).fps(0.0).build(),
        Err(CueError::Config(_))
    ));
    assert!(Runner::builder(()).fps(f64::INFINITY).build().is_err());
}

#[test]
fn frames_follow_the_clock_and_finish() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);

    runner.play(probe(Some(1.0)), 0.0).unwrap();
    wait_until("first frame", || snapshot(&seen) == [0.0]);
    assert_eq!(runner.state(), PlaybackState::Playing);

    clock.advance(0.5);
    wait_until("frame at 0.5", || snapshot(&seen).last() == Some(&0.5));

    clock.advance(5.0);
    runner.wait().unwrap();
    assert_eq!(runner.state(), PlaybackState::Finished);
    // Clamped to the target's end.
    assert_eq!(snapshot(&seen), [0.0, 0.5, 1.0]);
    assert_eq!(runner.position(), 1.0);
}

#[test]
fn pause_freezes_and_resume_continues_without_rewinding() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);

    runner.play(probe(None), 0.0).unwrap();
    wait_until("first frame", || snapshot(&seen).len() == 1);
    clock.advance(0.5);
    wait_until("frame at 0.5", || snapshot(&seen).last() == Some(&0.5));

    assert!(runner.pause());
    assert!(runner.is_paused());
    assert!(!runner.pause());
    clock.advance(10.0);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(snapshot(&seen), [0.0, 0.5]);
    assert_eq!(runner.position(), 0.5);

    assert!(runner.resume());
    assert!(!runner.resume());
    clock.advance(0.25);
    wait_until("frame at 0.75", || snapshot(&seen).last() == Some(&0.75));

    runner.stop();
    assert_eq!(runner.state(), PlaybackState::Stopped);
    let frames = snapshot(&seen);
    assert!(frames.windows(2).all(|w| w[0] < w[1]), "{frames:?}");
    runner.wait().unwrap();
}

#[test]
fn pause_and_resume_are_noops_outside_a_session() {
    let runner = Runner::new(());
    assert!(!runner.pause());
    assert!(!runner.resume());
}

#[test]
fn start_at_offsets_the_playhead() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);

    runner.play(probe(Some(4.0)), 1.5).unwrap();
    wait_until("first frame", || !snapshot(&seen).is_empty());
    assert_eq!(snapshot(&seen)[0], 1.5);
    clock.advance(0.5);
    wait_until("frame at 2.0", || snapshot(&seen).last() == Some(&2.0));
    runner.stop();
}

#[test]
fn negative_start_is_rejected_before_playing() {
    let runner = Runner::new(());
    assert!(matches!(
        runner.play(probe(Some(1.0)), -1.0),
        Err(CueError::InvalidTimeArgument(_))
    ));
    assert_eq!(runner.state(), PlaybackState::Idle);
}

#[test]
fn stop_is_idempotent() {
    let clock = Arc::new(ManualClock::new());
    let (runner, _seen) = recording_runner(&clock);
    runner.stop();
    assert_eq!(runner.state(), PlaybackState::Idle);

    runner.play(probe(None), 0.0).unwrap();
    runner.stop();
    runner.stop();
    assert_eq!(runner.state(), PlaybackState::Stopped);
    runner.wait().unwrap();
}

#[test]
fn stop_while_paused_ends_the_session() {
    let clock = Arc::new(ManualClock::new());
    let (runner, _seen) = recording_runner(&clock);
    runner.play(probe(None), 0.0).unwrap();
    assert!(runner.pause());
    runner.stop();
    assert_eq!(runner.state(), PlaybackState::Stopped);
    assert!(!runner.resume());
}

#[test]
fn render_error_aborts_the_loop_and_reaches_wait() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);
    let flaky = clip_fn(Some(2.0), |t, _: &()| {
        if t >= 0.5 {
            return Err(CueError::composition("bad blend"));
        }
        Ok(Frame::from([("t".to_owned(), Value::Number(t))]))
    })
    .unwrap();

    runner.play(flaky, 0.0).unwrap();
    wait_until("first frame", || snapshot(&seen).len() == 1);
    clock.advance(1.0);

    let err = runner.wait().unwrap_err();
    assert!(matches!(err, CueError::CompositionMismatch(_)));
    assert_eq!(runner.state(), PlaybackState::Stopped);
    // The error is handed out once.
    runner.wait().unwrap();
}

#[test]
fn play_restarts_a_running_session() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);

    runner.play(probe(None), 0.0).unwrap();
    clock.advance(2.0);
    wait_until("frame at 2.0", || snapshot(&seen).last() == Some(&2.0));

    runner.play(probe(None), 0.0).unwrap();
    wait_until("restart frame", || snapshot(&seen).last() == Some(&0.0));
    assert_eq!(runner.state(), PlaybackState::Playing);
    runner.stop();
}

#[test]
fn swap_renders_the_new_target_from_the_next_frame() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);
    let doubled = clip_fn(None, |t, _: &()| {
        Ok(Frame::from([("t".to_owned(), Value::Number(t * 2.0 + 100.0))]))
    })
    .unwrap();

    runner.play(probe(None), 0.0).unwrap();
    wait_until("first frame", || snapshot(&seen).len() == 1);
    runner.swap(Arc::clone(&doubled));
    clock.advance(1.0);
    wait_until("swapped frame", || snapshot(&seen).last() == Some(&102.0));
    assert!(Arc::ptr_eq(&runner.target().unwrap(), &doubled));
    runner.stop();
}

#[test]
fn tick_applies_and_outputs_but_render_frame_does_not() {
    let clock = Arc::new(ManualClock::new());
    let (runner, seen) = recording_runner(&clock);
    let clip = probe(Some(2.0));

    let frame = runner.render_frame(&*clip, 0.25).unwrap();
    assert_eq!(frame["t"], Value::Number(0.25));
    assert!(snapshot(&seen).is_empty());

    assert_eq!(runner.tick(&*clip, 0.75).unwrap(), 0.75);
    assert_eq!(snapshot(&seen), [0.75]);
    assert_eq!(runner.state(), PlaybackState::Idle);
}

#[test]
fn context_reaches_the_target() {
    let runner = Runner::new(0.5_f64);
    let gain = clip_fn(Some(1.0), |_, g: &f64| {
        Ok(Frame::from([("g".to_owned(), Value::Number(*g))]))
    })
    .unwrap();
    assert_eq!(runner.render_frame(&*gain, 0.0).unwrap()["g"], Value::Number(0.5));
    assert_eq!(*runner.ctx(), 0.5);
}

#[test]
fn stop_inside_output_keeps_wait_blocked_until_the_loop_exits() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{OnceLock, Weak};

    let slot: Arc<OnceLock<Weak<Runner>>> = Arc::new(OnceLock::new());
    let left_output = Arc::new(AtomicBool::new(false));
    let runner = {
        let slot = Arc::clone(&slot);
        let left_output = Arc::clone(&left_output);
        Runner::builder(())
            .fps(200.0)
            .output(move |_: &Frame| {
                let Some(runner) = slot.get().and_then(Weak::upgrade) else {
                    return;
                };
                runner.stop();
                thread::sleep(Duration::from_millis(100));
                left_output.store(true, Ordering::SeqCst);
            })
            .build()
            .unwrap()
    };
    let runner = Arc::new(runner);
    slot.set(Arc::downgrade(&runner)).unwrap();

    runner.play(probe(None), 0.0).unwrap();
    runner.wait().unwrap();
    assert!(left_output.load(Ordering::SeqCst));
    assert_eq!(runner.state(), PlaybackState::Stopped);

    // A second stop from outside finds nothing left to join.
    runner.stop();
}
