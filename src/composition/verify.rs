//! Start/end checkpoints of a timeline's placements, for previewing a show by
//! jumping to each edge and checking the rendered output.

use crate::composition::timeline::{Placement, Timeline};
use crate::foundation::core::ClipDuration;

/// End edges are pulled this far inside the clip so the point still renders it.
const END_NUDGE_SECS: f64 = 0.001;

/// Which side of a placement a verify point marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Start,
    End,
}

/// One checkpoint on the timeline, always in seconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VerifyPoint {
    pub time_seconds: f64,
    pub label: String,
    /// Index of the placement in insertion order.
    pub placement: usize,
    pub edge: Edge,
}

/// Verify points of a second-based timeline, including those of nested
/// timelines (also through [`ScaledClip`](crate::ScaledClip)), shifted by
/// their placement start.
pub fn collect_verify_points<C>(timeline: &Timeline<C>) -> Vec<VerifyPoint> {
    collect_with(timeline.placements(), &|t| t)
}

/// Shared walker; `to_seconds` maps the timeline's unit (seconds or beats) to
/// absolute seconds.
pub(crate) fn collect_with<C>(
    placements: &[Placement<C>],
    to_seconds: &dyn Fn(f64) -> f64,
) -> Vec<VerifyPoint> {
    let mut points = Vec::with_capacity(placements.len() * 2);

    for (i, p) in placements.iter().enumerate() {
        let label = p
            .label()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("clip[{i}]"));
        let start = to_seconds(p.start());

        points.push(VerifyPoint {
            time_seconds: start,
            label: format!("{label} (start)"),
            placement: i,
            edge: Edge::Start,
        });

        if let ClipDuration::Finite(d) = p.clip().duration()
            && d > 0.0
        {
            let end = (to_seconds(p.start() + d) - END_NUDGE_SECS).max(start);
            points.push(VerifyPoint {
                time_seconds: end,
                label: format!("{label} (end)"),
                placement: i,
                edge: Edge::End,
            });
        }

        let offset = p.start();
        points.extend(p.clip().nested_points(&|local| to_seconds(offset + local)));
    }

    points.sort_by(|a, b| {
        a.time_seconds
            .total_cmp(&b.time_seconds)
            .then(a.edge.cmp(&b.edge))
    });
    points
}

#[cfg(test)]
#[path = "../../tests/unit/composition/verify.rs"]
mod tests;
