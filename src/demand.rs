//! Demand projector (spec §4.4): writes segment-level (and optionally
//! segment-skill-level) demand tables under one of two semantics.

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::DemandMode;
use crate::domain::Window;
use crate::normalize::NormalizedShift;
use crate::segment::SegmentSet;

/// `segment_id -> demand` in person-minutes.
pub type SegmentDemand = BTreeMap<usize, i64>;
/// `(segment_id, skill) -> demand` in person-minutes.
pub type SegmentSkillDemand = BTreeMap<(usize, String), i64>;

/// Projects `windows` onto `segments` under `mode`. When any window carries
/// skill requirements, shift-level skill requirements are ignored elsewhere
/// in the pipeline (logged here, not re-validated).
pub fn project_demand(
    segments: &SegmentSet,
    windows: &[Window],
    mode: DemandMode,
) -> (SegmentDemand, SegmentSkillDemand) {
    let mut demand: SegmentDemand = BTreeMap::new();
    let mut skill_demand: SegmentSkillDemand = BTreeMap::new();

    let any_window_skill = windows.iter().any(|w| !w.skill_requirements.is_empty());
    if any_window_skill {
        warn!("window-level skill demand present; shift-level skill requirements are ignored");
    }

    for segment in &segments.segments {
        for window in windows {
            if window.day != segment.day || window.role != segment.role {
                continue;
            }
            let overlap = overlap_minutes(
                segment.start_min as i64,
                segment.end_min as i64,
                window.start_min as i64,
                window.end_min as i64,
            );
            if overlap <= 0 {
                continue;
            }

            let contribution = match mode {
                DemandMode::Headcount => window.demand as i64 * segment.duration_minutes(),
                DemandMode::PersonMinutes => window.demand as i64 * overlap,
            };
            *demand.entry(segment.id).or_insert(0) += contribution;

            for (skill, qty) in &window.skill_requirements {
                let skill_contribution = match mode {
                    DemandMode::Headcount => *qty as i64 * segment.duration_minutes(),
                    DemandMode::PersonMinutes => *qty as i64 * overlap,
                };
                *skill_demand
                    .entry((segment.id, skill.clone()))
                    .or_insert(0) += skill_contribution;
            }
        }
    }

    (demand, skill_demand)
}

/// Projects each shift's own `required_staff` onto the segments it covers,
/// used when `shifts.coverage_source = shifts` instead of window demand.
/// Segments are shift-aligned by construction, so a covering shift overlaps
/// a segment it covers for that segment's full duration — headcount and
/// person-minutes semantics coincide here.
pub fn project_shift_demand(segments: &SegmentSet, shifts: &[NormalizedShift]) -> SegmentDemand {
    let mut demand: SegmentDemand = BTreeMap::new();
    for shift in shifts {
        let Some(segment_ids) = segments.segments_of_shift.get(&shift.shift.id) else {
            continue;
        };
        for &segment_id in segment_ids {
            let segment = segments.segment(segment_id);
            let contribution = shift.shift.required_staff as i64 * segment.duration_minutes();
            *demand.entry(segment_id).or_insert(0) += contribution;
        }
    }
    demand
}

fn overlap_minutes(seg_start: i64, seg_end: i64, win_start: i64, win_end: i64) -> i64 {
    let start = seg_start.max(win_start);
    let end = seg_end.min(win_end);
    (end - start).max(0)
}
