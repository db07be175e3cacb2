//! Eligibility builder (spec §4.2): produces `can_assign: (employee, shift)
//! -> bool` from role qualification, declared availability, and time-off
//! overlap.

use std::collections::HashMap;

use crate::domain::{AvailabilityRow, Employee, TimeOffEntry};
use crate::error::BuildWarning;
use crate::normalize::NormalizedShift;

/// One `(employee, shift)` pair with its diagnostic flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityEntry {
    pub qual_ok: bool,
    pub is_available: bool,
    pub timeoff_block: bool,
}

impl EligibilityEntry {
    /// `can_assign = qual_ok && is_available && !timeoff_block`.
    pub fn can_assign(&self) -> bool {
        self.qual_ok && self.is_available && !self.timeoff_block
    }
}

/// The full `(employee_id, shift_id) -> EligibilityEntry` relation, plus
/// warnings collected along the way.
#[derive(Debug, Default)]
pub struct EligibilityReport {
    pub entries: HashMap<(String, String), EligibilityEntry>,
    pub warnings: Vec<BuildWarning>,
}

impl EligibilityReport {
    pub fn can_assign(&self, employee_id: &str, shift_id: &str) -> bool {
        self.entries
            .get(&(employee_id.to_string(), shift_id.to_string()))
            .map(|e| e.can_assign())
            .unwrap_or(false)
    }

    /// All shifts admissible for `employee_id`, in the order given.
    pub fn eligible_shifts_for<'a>(
        &self,
        employee_id: &str,
        shifts: &'a [NormalizedShift],
    ) -> Vec<&'a NormalizedShift> {
        shifts
            .iter()
            .filter(|s| self.can_assign(employee_id, &s.shift.id))
            .collect()
    }

    /// All employees admissible for `shift_id`, in the order given.
    pub fn eligible_employees_for<'a>(
        &self,
        shift_id: &str,
        employees: &'a [Employee],
    ) -> Vec<&'a Employee> {
        employees
            .iter()
            .filter(|e| self.can_assign(&e.id, shift_id))
            .collect()
    }
}

/// Builds the eligibility relation for every `(employee, shift)` pair.
///
/// Missing availability rows default to available. Time-off intervals that
/// intersect the shift's `[start_dt, end_dt)` zero `is_available`'s downstream
/// effect via `timeoff_block`. A pair appearing in availability but not
/// qualified is retained with `can_assign = false`.
pub fn build_eligibility(
    employees: &[Employee],
    shifts: &[NormalizedShift],
    availability: &[AvailabilityRow],
    time_off: &[TimeOffEntry],
) -> EligibilityReport {
    let mut report = EligibilityReport::default();

    let availability_index: HashMap<(&str, &str), bool> = availability
        .iter()
        .map(|row| ((row.employee_id.as_str(), row.shift_id.as_str()), row.is_available))
        .collect();

    let mut time_off_by_employee: HashMap<&str, Vec<&TimeOffEntry>> = HashMap::new();
    for entry in time_off {
        time_off_by_employee
            .entry(entry.employee_id.as_str())
            .or_default()
            .push(entry);
    }

    for employee in employees {
        for shift in shifts {
            let qual_ok = employee.roles.contains(&shift.shift.role);
            let is_available = availability_index
                .get(&(employee.id.as_str(), shift.shift.id.as_str()))
                .copied()
                .unwrap_or(true);

            let timeoff_block = time_off_by_employee
                .get(employee.id.as_str())
                .map(|entries| {
                    entries
                        .iter()
                        .any(|entry| time_off_overlaps_shift(entry, shift))
                })
                .unwrap_or(false);

            if timeoff_block {
                report.warnings.push(BuildWarning::TimeOffOverlap {
                    employee_id: employee.id.clone(),
                    shift_id: shift.shift.id.clone(),
                });
            }
            if !qual_ok && availability_index.contains_key(&(employee.id.as_str(), shift.shift.id.as_str())) {
                report.warnings.push(BuildWarning::UnqualifiedAvailabilityRow {
                    employee_id: employee.id.clone(),
                    shift_id: shift.shift.id.clone(),
                });
            }

            report.entries.insert(
                (employee.id.clone(), shift.shift.id.clone()),
                EligibilityEntry {
                    qual_ok,
                    is_available,
                    timeoff_block,
                },
            );
        }
    }

    report
}

fn time_off_overlaps_shift(entry: &TimeOffEntry, shift: &NormalizedShift) -> bool {
    let (off_start_min, off_end_min) = entry.effective_interval();
    let off_start = crate::time::add_minutes(entry.day, off_start_min);
    let off_end = crate::time::add_minutes(entry.day, off_end_min);
    off_start < shift.end_dt && shift.start_dt < off_end
}
