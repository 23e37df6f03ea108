use super::*;

#[test]
fn default_is_forty_fps() {
    let cfg = RunnerConfig::default();
    assert_eq!(cfg.fps, 40.0);
    cfg.validate().unwrap();
    let interval = cfg.frame_interval().as_secs_f64();
    assert!((interval - 0.025).abs() < 1e-6);
}

#[test]
fn json_fields_default_when_missing() {
    assert_eq!(RunnerConfig::from_json_str("{}").unwrap(), RunnerConfig::default());
    assert_eq!(RunnerConfig::from_json_str(r#"{"fps": 60}"#).unwrap().fps, 60.0);
}

#[test]
fn json_rejects_unknown_fields_and_bad_fps() {
    assert!(matches!(
        RunnerConfig::from_json_str(r#"{"fsp": 30}"#),
        Err(CueError::Config(_))
    ));
    assert!(matches!(
        RunnerConfig::from_json_str(r#"{"fps": 0}"#),
        Err(CueError::Config(_))
    ));
    assert!(RunnerConfig::from_json_str(r#"{"fps": -5.0}"#).is_err());
}

#[test]
fn validate_rejects_non_finite_fps() {
    let cfg = RunnerConfig { fps: f64::NAN };
    assert!(cfg.validate().is_err());
}
