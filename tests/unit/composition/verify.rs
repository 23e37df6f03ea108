use super::*;
use std::sync::Arc;

use crate::clip::model::{ClipRef, clip_fn};
use crate::clip::scaled::ScaledClip;
use crate::foundation::core::Frame;

fn silent(length: Option<f64>) -> ClipRef {
    clip_fn(length, |_, _: &()| Ok(Frame::new())).unwrap()
}

#[test]
fn empty_timeline_has_no_points() {
    assert!(collect_verify_points(&Timeline::<()>::new()).is_empty());
}

#[test]
fn single_clip_has_start_and_nudged_end() {
    let mut tl = Timeline::new();
    tl.add(1.0, silent(Some(2.0))).unwrap();
    let pts = collect_verify_points(&tl);
    assert_eq!(pts.len(), 2);
    assert_eq!(pts[0].edge, Edge::Start);
    assert_eq!(pts[0].time_seconds, 1.0);
    assert_eq!(pts[0].label, "clip[0] (start)");
    assert_eq!(pts[1].edge, Edge::End);
    assert!((pts[1].time_seconds - 2.999).abs() < 1e-9);
    assert_eq!(pts[1].label, "clip[0] (end)");
}

#[test]
fn unbounded_and_zero_length_clips_only_have_starts() {
    let mut tl = Timeline::new();
    tl.add(0.0, silent(None)).unwrap();
    tl.add(1.0, silent(Some(0.0))).unwrap();
    let pts = collect_verify_points(&tl);
    assert_eq!(pts.len(), 2);
    assert!(pts.iter().all(|p| p.edge == Edge::Start));
}

#[test]
fn very_short_clip_end_never_precedes_start() {
    let mut tl = Timeline::new();
    tl.add(2.0, silent(Some(0.0005))).unwrap();
    let pts = collect_verify_points(&tl);
    assert_eq!(pts[1].time_seconds, 2.0);
    assert_eq!(pts[0].edge, Edge::Start);
}

#[test]
fn points_are_sorted_with_starts_first_on_ties() {
    let mut tl = Timeline::new();
    tl.add_labeled(3.0, "late", silent(Some(1.0))).unwrap();
    tl.add_labeled(0.0, "intro", silent(Some(2.0))).unwrap();
    // Starts exactly where "intro" has its (nudged) end point.
    tl.add_labeled(2.0 - END_NUDGE_SECS, "overlap", silent(Some(0.5)))
        .unwrap();

    let pts = collect_verify_points(&tl);
    let labels: Vec<&str> = pts.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(
        labels,
        [
            "intro (start)",
            "overlap (start)",
            "intro (end)",
            "overlap (end)",
            "late (start)",
            "late (end)",
        ]
    );
    assert_eq!(pts[0].placement, 1);
    assert_eq!(pts[4].placement, 0);
}

#[test]
fn serializes_edges_in_snake_case() {
    let mut tl = Timeline::new();
    tl.add_labeled(0.0, "a", silent(Some(1.0))).unwrap();
    let json = serde_json::to_string(&collect_verify_points(&tl)[0]).unwrap();
    assert!(json.contains("\"edge\":\"start\""));
}

fn time_of(pts: &[VerifyPoint], label: &str) -> f64 {
    pts.iter()
        .find(|p| p.label == label)
        .unwrap_or_else(|| panic!("no point labeled {label}"))
        .time_seconds
}

/// A one-clip timeline: "hit" at 0.5 for 0.5.
fn scene() -> ClipRef {
    let mut tl = Timeline::new();
    tl.add_labeled(0.5, "hit", silent(Some(0.5))).unwrap();
    Arc::new(tl)
}

#[test]
fn nested_timeline_points_are_shifted_by_the_parent_start() {
    let mut show = Timeline::new();
    show.add_labeled(2.0, "scene", scene()).unwrap();

    let pts = collect_verify_points(&show);
    assert_eq!(pts.len(), 4);
    assert_eq!(time_of(&pts, "scene (start)"), 2.0);
    assert_eq!(time_of(&pts, "hit (start)"), 2.5);
    assert!((time_of(&pts, "hit (end)") - 2.999).abs() < 1e-9);
    assert!((time_of(&pts, "scene (end)") - 2.999).abs() < 1e-9);
    assert!(pts.windows(2).all(|w| w[0].time_seconds <= w[1].time_seconds));
}

#[test]
fn scaled_clips_are_looked_through() {
    let faded: ClipRef = Arc::new(
        ScaledClip::new(scene())
            .with_fades(0.1, 0.1)
            .unwrap(),
    );
    let mut show = Timeline::new();
    show.add(1.0, faded).unwrap();

    let pts = collect_verify_points(&show);
    assert_eq!(pts.len(), 4);
    assert_eq!(time_of(&pts, "clip[0] (start)"), 1.0);
    assert_eq!(time_of(&pts, "hit (start)"), 1.5);
}

#[test]
fn points_recurse_through_several_levels() {
    let mut act = Timeline::new();
    act.add(1.0, scene()).unwrap();
    let act: ClipRef = Arc::new(act);
    let mut show = Timeline::new();
    show.add(10.0, act).unwrap();

    let pts = collect_verify_points(&show);
    assert_eq!(pts.len(), 6);
    assert_eq!(time_of(&pts, "hit (start)"), 11.5);
}
