//! Extractors (spec §2 item 8, §6 "Persisted outputs"): read assignments,
//! segment coverage, per-term objective contributions, and diagnostic
//! summaries back out of a solved [`Model`]. Every function here is
//! read-only against the backend; none of them mutate the model.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::BuildConfig;
use crate::domain::Preference;
use crate::model::{effective_weight, Model, SkillScope};
use crate::normalize::NormalizedShift;
use crate::segment::SegmentSet;
use crate::solve::{LinearExpr, SolveOutcome, SolveStatus, SolverBackend};

/// One row of the assignments output (spec §6: `assignments CSV`).
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRow {
    pub employee_id: String,
    pub shift_id: String,
    pub day: NaiveDate,
    pub start_min: u16,
    pub end_min: u16,
    pub duration_hours: f64,
    pub role: String,
}

/// Extracts every `(employee, shift)` pair whose assignment variable is 1.
/// Empty on an infeasible outcome with no incumbent (spec §7).
pub fn extract_assignments<B: SolverBackend>(
    backend: &B,
    model: &Model,
    shifts: &[NormalizedShift],
) -> Vec<AssignmentRow> {
    let shift_by_id: BTreeMap<&str, &NormalizedShift> =
        shifts.iter().map(|s| (s.shift.id.as_str(), s)).collect();
    let mut rows = Vec::new();
    for ((employee_id, shift_id), &var) in &model.assignment {
        if backend.value_of(var) != 1 {
            continue;
        }
        let Some(shift) = shift_by_id.get(shift_id.as_str()) else {
            continue;
        };
        rows.push(AssignmentRow {
            employee_id: employee_id.clone(),
            shift_id: shift_id.clone(),
            day: shift.shift.day,
            start_min: shift.shift.start_min,
            end_min: shift.shift.end_min,
            duration_hours: shift.duration_minutes as f64 / 60.0,
            role: shift.shift.role.clone(),
        });
    }
    rows.sort_by(|a, b| {
        (a.day, a.shift_id.as_str(), a.employee_id.as_str()).cmp(&(
            b.day,
            b.shift_id.as_str(),
            b.employee_id.as_str(),
        ))
    });
    rows
}

/// One row of the `segment_coverage.csv` diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCoverageRow {
    pub segment_id: usize,
    pub day: NaiveDate,
    pub role: String,
    pub shortfall: i64,
    pub overstaff: i64,
}

pub fn extract_segment_coverage<B: SolverBackend>(
    backend: &B,
    model: &Model,
    segments: &SegmentSet,
) -> Vec<SegmentCoverageRow> {
    let mut rows = Vec::new();
    for (&segment_id, &short_var) in &model.segment_short {
        let segment = segments.segment(segment_id);
        let overstaff = model
            .segment_over
            .get(&segment_id)
            .map(|&v| backend.value_of(v))
            .unwrap_or(0);
        rows.push(SegmentCoverageRow {
            segment_id,
            day: segment.day,
            role: segment.role.clone(),
            shortfall: backend.value_of(short_var),
            overstaff,
        });
    }
    rows.sort_by(|a, b| (a.day, a.role.as_str(), a.segment_id).cmp(&(b.day, b.role.as_str(), b.segment_id)));
    rows
}

/// One row of the per-employee overtime diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct OvertimeRow {
    pub employee_id: String,
    pub overtime_minutes: i64,
}

pub fn extract_overtime<B: SolverBackend>(backend: &B, model: &Model) -> Vec<OvertimeRow> {
    let mut rows: Vec<OvertimeRow> = model
        .overtime
        .iter()
        .map(|(employee_id, &var)| OvertimeRow {
            employee_id: employee_id.clone(),
            overtime_minutes: backend.value_of(var),
        })
        .collect();
    rows.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
    rows
}

/// One row of the per-`(segment-or-shift, skill)` shortfall diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillShortfallRow {
    pub scope: String,
    pub skill: String,
    pub shortfall_minutes: i64,
}

pub fn extract_skill_shortfall<B: SolverBackend>(backend: &B, model: &Model) -> Vec<SkillShortfallRow> {
    let mut rows: Vec<SkillShortfallRow> = model
        .skill_short
        .iter()
        .map(|((scope, skill), &var)| SkillShortfallRow {
            scope: match scope {
                SkillScope::Segment(id) => format!("segment:{id}"),
                SkillScope::Shift(id) => format!("shift:{id}"),
            },
            skill: skill.clone(),
            shortfall_minutes: backend.value_of(var),
        })
        .collect();
    rows.sort_by(|a, b| (a.scope.as_str(), a.skill.as_str()).cmp(&(b.scope.as_str(), b.skill.as_str())));
    rows
}

/// One row of the `objective_breakdown.csv` diagnostic: each priority-ordered
/// term's raw person-minute total and its weighted contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveBreakdownRow {
    pub term: String,
    pub raw_person_minutes: i64,
    pub weighted_contribution: i64,
}

pub fn extract_objective_breakdown<B: SolverBackend>(
    backend: &B,
    model: &Model,
    config: &BuildConfig,
) -> Vec<ObjectiveBreakdownRow> {
    let mut rows = Vec::new();
    for key in &config.objective.priority {
        let Some(expr) = model.objective_terms.get(key) else {
            continue;
        };
        let raw = eval_on_backend(backend, expr);
        let weight = effective_weight(model, config, key);
        rows.push(ObjectiveBreakdownRow {
            term: key.clone(),
            raw_person_minutes: raw,
            weighted_contribution: raw * weight,
        });
    }
    rows
}

fn eval_on_backend<B: SolverBackend>(backend: &B, expr: &LinearExpr) -> i64 {
    let mut total = expr.constant;
    for (var, coeff) in &expr.terms {
        total += coeff * backend.value_of(*var);
    }
    total
}

/// `constraint_status.csv`: whether the most recent solve reported a
/// feasible/optimal result, plus the raw solver status/objective passthrough.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintStatus {
    pub status: SolveStatus,
    pub objective_value: Option<i64>,
    pub feasible: bool,
}

pub fn extract_constraint_status(outcome: &SolveOutcome) -> ConstraintStatus {
    ConstraintStatus {
        status: outcome.status.clone(),
        objective_value: outcome.objective_value,
        feasible: matches!(outcome.status, SolveStatus::Optimal | SolveStatus::Feasible),
    }
}

/// One row of the preference-satisfaction diagnostic: assigned pairs that
/// carried a nonzero preference score.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceRow {
    pub employee_id: String,
    pub shift_id: String,
    pub score: f64,
    pub satisfied: bool,
}

pub fn extract_preferences<B: SolverBackend>(
    backend: &B,
    model: &Model,
    preferences: &[Preference],
) -> Vec<PreferenceRow> {
    let mut rows = Vec::new();
    for pref in preferences {
        let key = (pref.employee_id.clone(), pref.shift_id.clone());
        let Some(&var) = model.assignment.get(&key) else {
            continue;
        };
        rows.push(PreferenceRow {
            employee_id: pref.employee_id.clone(),
            shift_id: pref.shift_id.clone(),
            score: pref.score,
            satisfied: backend.value_of(var) == 1,
        });
    }
    rows.sort_by(|a, b| {
        (a.employee_id.as_str(), a.shift_id.as_str()).cmp(&(b.employee_id.as_str(), b.shift_id.as_str()))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::domain::{Employee, Shift, Window};
    use crate::eligibility::build_eligibility;
    use crate::model::{build_model, solve_weighted, ModelInputs};
    use crate::normalize::normalize_shift;
    use crate::segment::{build_segments, SegmentBuilderOptions};
    use crate::solve::backend::reference::ReferenceBackend;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn extracts_the_single_happy_path_assignment() {
        let employee = Employee::new("E1", "Alice").with_role("Nurse");
        let shift = normalize_shift(Shift::new("S1", day(), 480, 960, "Nurse", 1)).unwrap();
        let window = Window::new("W1", day(), 480, 960, "Nurse", 1);
        let eligibility = build_eligibility(&[employee.clone()], std::slice::from_ref(&shift), &[], &[]);
        let options = SegmentBuilderOptions {
            midnight_policy: crate::config::MidnightPolicy::Split,
            merge_signatures: false,
            warn_slots_threshold: 0,
            hard_slots_threshold: 0,
        };
        let (segments, _) =
            build_segments(std::slice::from_ref(&shift), &[window.clone()], &options).unwrap();

        let config = BuildConfig::default();
        let inputs = ModelInputs {
            employees: &[employee],
            shifts: &[shift.clone()],
            windows: &[window],
            eligibility: &eligibility,
            segments: &segments,
            time_off: &[],
            overtime_costs: &[],
            preferences: &[],
        };
        let mut backend = ReferenceBackend::new();
        let model = build_model(&mut backend, &inputs, &config).unwrap();
        let outcome = solve_weighted(&mut backend, &model, &config, None);
        assert_eq!(outcome.status, crate::solve::SolveStatus::Optimal);

        let assignments = extract_assignments(&backend, &model, &[shift]);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].employee_id, "E1");
        assert_eq!(assignments[0].shift_id, "S1");

        let coverage = extract_segment_coverage(&backend, &model, &segments);
        assert!(coverage.iter().all(|row| row.shortfall == 0));

        let status = extract_constraint_status(&outcome);
        assert!(status.feasible);
    }
}
