//! Segment builder (spec §4.3) — the first half of the hard subsystem.
//!
//! Segments are derived from the **shift lattice only**: for each
//! `(day, role)` timeline, the start/end minutes of every shift run are the
//! candidate segment boundaries. Window intervals are then required to land
//! exactly on those boundaries (the "strict" alignment requirement); a
//! window whose endpoints don't coincide with an existing boundary is a
//! fatal [`BuildError::WindowNotAligned`]. See `DESIGN.md` for why this
//! reading was chosen over folding window endpoints into the boundary set.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::config::MidnightPolicy;
use crate::domain::Window;
use crate::error::{BuildError, BuildWarning};
use crate::normalize::NormalizedShift;

/// A maximal `(day, role)` interval whose endpoints are event points of the
/// shift lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: usize,
    pub day: NaiveDate,
    pub role: String,
    /// Minutes since midnight on `day`. Under [`MidnightPolicy::Extend`]
    /// this may exceed 1440 for the overflow tail of an overnight shift.
    pub start_min: i32,
    pub end_min: i32,
    /// Shift ids covering this segment, sorted for a stable signature.
    pub covering_shifts: Vec<String>,
}

impl Segment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_min - self.start_min) as i64
    }

    fn signature(&self) -> &[String] {
        &self.covering_shifts
    }
}

/// The output of the segment builder: the segments themselves plus the
/// bipartite adjacency from shift id to the (contiguous) segment indices it
/// covers.
#[derive(Debug, Default)]
pub struct SegmentSet {
    pub segments: Vec<Segment>,
    pub segments_of_shift: BTreeMap<String, Vec<usize>>,
}

impl SegmentSet {
    pub fn segment(&self, id: usize) -> &Segment {
        &self.segments[id]
    }
}

#[derive(Clone)]
struct ShiftRun {
    shift_id: String,
    start: i32,
    end: i32,
}

pub struct SegmentBuilderOptions {
    pub midnight_policy: MidnightPolicy,
    pub merge_signatures: bool,
    pub warn_slots_threshold: usize,
    pub hard_slots_threshold: usize,
}

impl From<&crate::config::WindowsConfig> for SegmentBuilderOptions {
    fn from(windows: &crate::config::WindowsConfig) -> Self {
        Self {
            midnight_policy: windows.midnight_policy,
            merge_signatures: windows.merge_signatures,
            warn_slots_threshold: windows.warn_slots_threshold,
            hard_slots_threshold: windows.hard_slots_threshold,
        }
    }
}

/// Builds segments for every `(day, role)` timeline touched by `shifts`,
/// then projects `windows` onto them, failing fatally on misalignment or a
/// hard threshold breach. Returns the segment set plus any non-fatal
/// warnings (soft threshold breaches).
pub fn build_segments(
    shifts: &[NormalizedShift],
    windows: &[Window],
    options: &SegmentBuilderOptions,
) -> Result<(SegmentSet, Vec<BuildWarning>), BuildError> {
    let mut runs_by_key: BTreeMap<(NaiveDate, String), Vec<ShiftRun>> = BTreeMap::new();

    for shift in shifts {
        let role = shift.shift.role.clone();
        let day = shift.shift.day;
        let start = shift.shift.start_min as i32;
        let end = shift.shift.end_min as i32;

        if !shift.crosses_midnight {
            runs_by_key
                .entry((day, role))
                .or_default()
                .push(ShiftRun {
                    shift_id: shift.shift.id.clone(),
                    start,
                    end,
                });
            continue;
        }

        match options.midnight_policy {
            MidnightPolicy::Split => {
                runs_by_key
                    .entry((day, role.clone()))
                    .or_default()
                    .push(ShiftRun {
                        shift_id: shift.shift.id.clone(),
                        start,
                        end: 1440,
                    });
                let next_day = day.succ_opt().unwrap_or(day);
                runs_by_key
                    .entry((next_day, role))
                    .or_default()
                    .push(ShiftRun {
                        shift_id: shift.shift.id.clone(),
                        start: 0,
                        end,
                    });
            }
            MidnightPolicy::Extend => {
                runs_by_key
                    .entry((day, role))
                    .or_default()
                    .push(ShiftRun {
                        shift_id: shift.shift.id.clone(),
                        start,
                        end: 1440 + end,
                    });
            }
        }
    }

    let mut windows_by_key: BTreeMap<(NaiveDate, String), Vec<&Window>> = BTreeMap::new();
    for window in windows {
        windows_by_key
            .entry((window.day, window.role.clone()))
            .or_default()
            .push(window);
    }

    let mut segment_set = SegmentSet::default();
    let mut warnings = Vec::new();

    let mut all_keys: BTreeSet<(NaiveDate, String)> = runs_by_key.keys().cloned().collect();
    all_keys.extend(windows_by_key.keys().cloned());

    for key in all_keys {
        let (day, role) = key.clone();
        let runs = runs_by_key.get(&key).cloned_default();
        let group_windows = windows_by_key.get(&key).cloned_default();

        let mut boundaries: BTreeSet<i32> = BTreeSet::new();
        for run in &runs {
            boundaries.insert(run.start);
            boundaries.insert(run.end);
        }
        let boundary_vec: Vec<i32> = boundaries.iter().copied().collect();

        // Validate window alignment against the shift-derived boundaries
        // before materializing segments for this (day, role).
        for window in &group_windows {
            check_alignment(&boundary_vec, window)?;
        }

        if boundary_vec.len() < 2 {
            continue;
        }

        let mut segments_this_group = Vec::with_capacity(boundary_vec.len() - 1);
        for pair in boundary_vec.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let mut covering: Vec<String> = runs
                .iter()
                .filter(|r| r.start <= start && end <= r.end)
                .map(|r| r.shift_id.clone())
                .collect();
            covering.sort();
            covering.dedup();
            segments_this_group.push(Segment {
                id: 0, // assigned after merge
                day,
                role: role.clone(),
                start_min: start,
                end_min: end,
                covering_shifts: covering,
            });
        }

        if options.merge_signatures {
            let window_boundaries: BTreeSet<i32> = group_windows
                .iter()
                .flat_map(|w| [w.start_min as i32, w.end_min as i32])
                .collect();
            segments_this_group = merge_adjacent(segments_this_group, &window_boundaries);
        }

        let count = segments_this_group.len();
        if options.hard_slots_threshold > 0 && count > options.hard_slots_threshold {
            return Err(BuildError::SegmentThresholdExceeded {
                day,
                role,
                count,
                threshold: options.hard_slots_threshold,
            });
        }
        if options.warn_slots_threshold > 0 && count > options.warn_slots_threshold {
            warnings.push(BuildWarning::SegmentThresholdWarning {
                day,
                role: role.clone(),
                count,
                threshold: options.warn_slots_threshold,
            });
        }

        for mut segment in segments_this_group {
            let id = segment_set.segments.len();
            segment.id = id;
            for shift_id in &segment.covering_shifts {
                segment_set
                    .segments_of_shift
                    .entry(shift_id.clone())
                    .or_default()
                    .push(id);
            }
            segment_set.segments.push(segment);
        }
    }

    Ok((segment_set, warnings))
}

fn check_alignment(boundaries: &[i32], window: &Window) -> Result<(), BuildError> {
    let start = window.start_min as i32;
    let end = window.end_min as i32;
    let has_start = boundaries.binary_search(&start).is_ok();
    let has_end = boundaries.binary_search(&end).is_ok();
    if has_start && has_end {
        return Ok(());
    }
    let gap_minutes = if !has_start {
        let next = boundaries.iter().find(|&&b| b > start).copied().unwrap_or(end);
        (next.min(end) - start) as i64
    } else {
        let prev = boundaries.iter().rev().find(|&&b| b < end).copied().unwrap_or(start);
        (end - prev.max(start)) as i64
    };
    Err(BuildError::WindowNotAligned {
        window_id: window.id.clone(),
        day: window.day,
        role: window.role.clone(),
        gap_minutes,
    })
}

fn merge_adjacent(segments: Vec<Segment>, window_boundaries: &BTreeSet<i32>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(prev)
                if prev.signature() == segment.signature()
                    && !window_boundaries.contains(&prev.end_min) =>
            {
                prev.end_min = segment.end_min;
            }
            _ => merged.push(segment),
        }
    }
    merged
}

trait OrDefaultClone<T> {
    fn cloned_default(self) -> Vec<T>;
}

impl<T: Clone> OrDefaultClone<T> for Option<&Vec<T>> {
    fn cloned_default(self) -> Vec<T> {
        self.cloned().unwrap_or_default()
    }
}
