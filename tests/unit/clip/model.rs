use super::*;
use crate::foundation::core::Value;
use crate::foundation::error::CueError;

fn level(t: f64) -> CueResult<Frame> {
    Ok(Frame::from([("ch".to_owned(), Value::Number(t))]))
}

#[test]
fn clip_fn_reports_duration() {
    let c: ClipRef = clip_fn(Some(2.0), |t, _: &()| level(t)).unwrap();
    assert_eq!(c.duration(), ClipDuration::Finite(2.0));

    let c: ClipRef = clip_fn(None, |t, _: &()| level(t)).unwrap();
    assert_eq!(c.duration(), ClipDuration::Unbounded);
}

#[test]
fn clip_fn_rejects_negative_duration() {
    let err = clip_fn(Some(-1.0), |t, _: &()| level(t)).err().unwrap();
    assert!(matches!(err, CueError::InvalidDuration(_)));
}

#[test]
fn render_passes_time_and_context() {
    let c: ClipRef<f64> = clip_fn(Some(4.0), |t, gain: &f64| level(t * gain)).unwrap();
    assert_eq!(c.render(1.5, &2.0).unwrap()["ch"], Value::Number(3.0));
}

#[test]
fn render_errors_propagate() {
    let c: ClipRef = clip_fn(Some(1.0), |_, _: &()| {
        Err(CueError::composition("no numbers here"))
    })
    .unwrap();
    assert!(c.render(0.0, &()).is_err());
}
