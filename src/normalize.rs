//! Shift normalizer (spec §4.1): computes `(start_dt, end_dt,
//! duration_minutes, crosses_midnight)` for each shift, and splits overnight
//! windows into same-day sub-windows.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{Shift, Window};
use crate::error::BuildError;
use crate::time::add_minutes;

/// A shift with its derived datetime bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedShift {
    pub shift: Shift,
    pub start_dt: NaiveDateTime,
    pub end_dt: NaiveDateTime,
    pub duration_minutes: i64,
    pub crosses_midnight: bool,
}

/// Normalizes one shift. Equal start/end is rejected unless both are
/// `00:00` (a full-day shift of 1440 minutes).
pub fn normalize_shift(shift: Shift) -> Result<NormalizedShift, BuildError> {
    let start_dt = add_minutes(shift.day, shift.start_min);
    let crosses_midnight = shift.end_min <= shift.start_min;

    if shift.start_min == shift.end_min && shift.start_min != 0 {
        return Err(BuildError::DegenerateShiftInterval {
            shift_id: shift.id.clone(),
        });
    }

    let end_dt = if crosses_midnight {
        add_minutes(shift.day.succ_opt().unwrap_or(shift.day), shift.end_min)
    } else {
        add_minutes(shift.day, shift.end_min)
    };

    let duration_minutes = (end_dt - start_dt).num_minutes();
    if !(1..=1440).contains(&duration_minutes) {
        return Err(BuildError::ShiftDurationOutOfRange {
            shift_id: shift.id.clone(),
            duration_minutes,
        });
    }

    Ok(NormalizedShift {
        shift,
        start_dt,
        end_dt,
        duration_minutes,
        crosses_midnight,
    })
}

/// Normalizes a batch of shifts, rejecting duplicate ids.
pub fn normalize_shifts(shifts: Vec<Shift>) -> Result<Vec<NormalizedShift>, BuildError> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(shifts.len());
    for shift in shifts {
        if !seen.insert(shift.id.clone()) {
            return Err(BuildError::DuplicateShiftId { shift_id: shift.id });
        }
        out.push(normalize_shift(shift)?);
    }
    Ok(out)
}

/// Normalizes a raw window, same convention as shifts: `end_min <= start_min`
/// means the window crosses midnight. Crossing windows are split into two
/// same-role pieces on consecutive days with suffixes `__D0`/`__D1`, each
/// satisfying the post-split invariant `end_min > start_min`. A window that
/// doesn't cross midnight is returned unchanged (as a single-element `Vec`).
pub fn normalize_window(window: Window) -> Result<Vec<Window>, BuildError> {
    if window.end_min > window.start_min {
        window.validate()?;
        return Ok(vec![window]);
    }
    let day0 = Window {
        id: format!("{}__D0", window.id),
        day: window.day,
        start_min: window.start_min,
        end_min: 1440,
        role: window.role.clone(),
        demand: window.demand,
        skill_requirements: window.skill_requirements.clone(),
    };
    let day1 = Window {
        id: format!("{}__D1", window.id),
        day: next_day(window.day),
        start_min: 0,
        end_min: window.end_min,
        role: window.role,
        demand: window.demand,
        skill_requirements: window.skill_requirements,
    };
    day0.validate()?;
    if day1.end_min > 0 {
        day1.validate()?;
        Ok(vec![day0, day1])
    } else {
        Ok(vec![day0])
    }
}

/// Normalizes a batch of windows, flattening any midnight splits.
pub fn normalize_windows(windows: Vec<Window>) -> Result<Vec<Window>, BuildError> {
    let mut out = Vec::with_capacity(windows.len());
    for window in windows {
        out.extend(normalize_window(window)?);
    }
    Ok(out)
}

fn next_day(day: NaiveDate) -> NaiveDate {
    day.succ_opt().unwrap_or(day)
}
