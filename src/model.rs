//! Model builder (spec §4.5, the core hard subsystem): materializes every
//! decision variable, hard constraint, and objective term against a
//! [`SolverBackend`], then hands back a [`Model`] describing where each
//! variable and term landed so [`crate::extract`] and the solve orchestration
//! in this module can read them back out.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};

use crate::config::{BuildConfig, CoverageSource, ObjectiveMode, SkillMode};
use crate::demand::{project_demand, project_shift_demand};
use crate::domain::{Employee, OvertimeCost, Preference, TimeOffEntry, Window};
use crate::eligibility::EligibilityReport;
use crate::error::BuildError;
use crate::normalize::NormalizedShift;
use crate::segment::SegmentSet;
use crate::solve::{LinearExpr, ObjectiveSense, SolveOutcome, SolveStatus, SolverBackend, VarId};

/// Where a skill-shortfall variable is anchored, per `skills.skill_mode`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkillScope {
    Segment(usize),
    Shift(String),
}

/// Inputs the builder reads by reference; nothing here is owned or mutated.
pub struct ModelInputs<'a> {
    pub employees: &'a [Employee],
    pub shifts: &'a [NormalizedShift],
    pub windows: &'a [Window],
    pub eligibility: &'a EligibilityReport,
    pub segments: &'a SegmentSet,
    pub time_off: &'a [TimeOffEntry],
    pub overtime_costs: &'a [OvertimeCost],
    pub preferences: &'a [Preference],
}

/// Every variable and objective term the builder created, keyed so callers
/// can read assignments, shortfalls, and per-term contributions back out.
#[derive(Debug, Default)]
pub struct Model {
    pub assignment: BTreeMap<(String, String), VarId>,
    pub shift_agg: BTreeMap<String, VarId>,
    pub segment_short: BTreeMap<usize, VarId>,
    pub segment_over: BTreeMap<usize, VarId>,
    pub skill_short: BTreeMap<(SkillScope, String), VarId>,
    pub overtime: BTreeMap<String, VarId>,
    pub external_use: BTreeMap<String, VarId>,
    /// Each employee's total assigned minutes, as a reusable linear
    /// expression over `assignment` variables (not a standalone backend var).
    pub worked_expr: BTreeMap<String, LinearExpr>,
    /// Raw per-key objective contributions in person-minutes, pre-weight.
    pub objective_terms: BTreeMap<String, LinearExpr>,
    /// Divisor folded into the `fairness` term's weight at assembly time
    /// (see [`weighted_objective`]) because the term is `N *` true deviation.
    pub fairness_divisor: i64,
}

/// Builds the full model against `backend`. Returns the fatal [`BuildError`]
/// on the first invariant breach (there are none left to check here — by
/// this stage eligibility/segments/demand have already validated their own
/// invariants — but `required_staff` skill-sum sanity is checked inline).
pub fn build_model<B: SolverBackend>(
    backend: &mut B,
    inputs: &ModelInputs,
    config: &BuildConfig,
) -> Result<Model, BuildError> {
    let mut model = Model::default();

    let mut employees_sorted: Vec<&Employee> = inputs.employees.iter().collect();
    employees_sorted.sort_by(|a, b| a.id.cmp(&b.id));

    // --- assignment + shift aggregate variables -------------------------
    for employee in &employees_sorted {
        let mut eligible_shifts = inputs.eligibility.eligible_shifts_for(&employee.id, inputs.shifts);
        eligible_shifts.sort_by(|a, b| a.shift.id.cmp(&b.shift.id));
        for shift in eligible_shifts {
            let name = format!("x[{},{}]", employee.id, shift.shift.id);
            let var = backend.new_bool_var(&name);
            model
                .assignment
                .insert((employee.id.clone(), shift.shift.id.clone()), var);
        }
    }

    for shift in inputs.shifts {
        let eligible_count = employees_sorted
            .iter()
            .filter(|e| inputs.eligibility.can_assign(&e.id, &shift.shift.id))
            .count();
        let name = format!("y[{}]", shift.shift.id);
        let y = backend.new_int_var(0, eligible_count as i64, &name)?;
        model.shift_agg.insert(shift.shift.id.clone(), y);

        // Constraint 1: aggregate definition y[s] = sum_e x[e,s].
        let mut expr = LinearExpr::term(y, -1);
        for employee in &employees_sorted {
            if let Some(&x) = model.assignment.get(&(employee.id.clone(), shift.shift.id.clone())) {
                expr = expr.add_term(x, 1);
            }
        }
        backend.add_linear_eq(expr, 0);
    }

    // --- segment coverage (constraint 2) --------------------------------
    let (segment_demand, window_skill_demand) = match config.shifts.coverage_source {
        CoverageSource::Windows => project_demand(inputs.segments, inputs.windows, config.shifts.demand_mode),
        CoverageSource::Shifts => (
            project_shift_demand(inputs.segments, inputs.shifts),
            BTreeMap::new(),
        ),
    };
    let unmet_key = match config.shifts.coverage_source {
        CoverageSource::Windows => "unmet_window",
        CoverageSource::Shifts => "unmet_demand",
    };

    let mut segments_with_capacity: BTreeSet<usize> = BTreeSet::new();
    for (shift_id, segment_ids) in &inputs.segments.segments_of_shift {
        if model.shift_agg.contains_key(shift_id) {
            segments_with_capacity.extend(segment_ids.iter().copied());
        }
    }
    let mut relevant_segments: BTreeSet<usize> = segment_demand.keys().copied().collect();
    relevant_segments.extend(segments_with_capacity);

    let mut unmet_total = LinearExpr::default();
    let mut overstaff_total = LinearExpr::default();

    for &segment_id in &relevant_segments {
        let segment = inputs.segments.segment(segment_id);
        let demand = segment_demand.get(&segment_id).copied().unwrap_or(0);

        let short_name = format!("short_seg[{segment_id}]");
        let over_name = format!("over_seg[{segment_id}]");
        let short = backend.new_int_var(0, demand.max(0), &short_name)?;
        let over = backend.new_int_var(0, i64::MAX / 4, &over_name)?;
        model.segment_short.insert(segment_id, short);
        model.segment_over.insert(segment_id, over);

        let mut expr = LinearExpr::term(short, 1).add_term(over, -1);
        for shift_id in &segment.covering_shifts {
            if let Some(&y) = model.shift_agg.get(shift_id) {
                expr = expr.add_term(y, segment.duration_minutes());
            }
        }
        backend.add_linear_eq(expr, demand);

        unmet_total = unmet_total.add_term(short, 1);
        overstaff_total = overstaff_total.add_term(over, 1);
    }
    model.objective_terms.insert(unmet_key.to_string(), unmet_total);
    model
        .objective_terms
        .insert("overstaff".to_string(), overstaff_total);

    // --- skill coverage (constraint 3) ----------------------------------
    let mut skill_total = LinearExpr::default();
    match config.skills.skill_mode {
        SkillMode::BySegment => {
            for (&(segment_id, ref skill), &required) in &window_skill_demand {
                let segment = inputs.segments.segment(segment_id);
                let short_name = format!("short_skill[{segment_id},{skill}]");
                let var = backend.new_int_var(0, required.max(0), &short_name)?;
                model
                    .skill_short
                    .insert((SkillScope::Segment(segment_id), skill.clone()), var);

                let mut expr = LinearExpr::term(var, 1);
                for shift_id in &segment.covering_shifts {
                    for employee in &employees_sorted {
                        if !employee.skills.contains(skill) {
                            continue;
                        }
                        if let Some(&x) = model.assignment.get(&(employee.id.clone(), shift_id.clone())) {
                            expr = expr.add_term(x, segment.duration_minutes());
                        }
                    }
                }
                if config.skills.enable_slack {
                    backend.add_linear_ge(expr, required);
                } else {
                    backend.add_linear_ge(expr.clone(), required);
                    backend.add_linear_le(LinearExpr::term(var, 1), 0);
                }
                skill_total = skill_total.add_term(var, 1);
            }
        }
        SkillMode::ByShift => {
            for shift in inputs.shifts {
                let total_required: u32 = shift.shift.skill_requirements.values().sum();
                if total_required > shift.shift.required_staff {
                    tracing::warn!(
                        shift_id = %shift.shift.id,
                        "skill requirement total exceeds required_staff"
                    );
                }
                for (skill, &required) in &shift.shift.skill_requirements {
                    let required_minutes = required as i64 * shift.duration_minutes;
                    let short_name = format!("short_skill[{},{}]", shift.shift.id, skill);
                    let var = backend.new_int_var(0, required_minutes.max(0), &short_name)?;
                    model
                        .skill_short
                        .insert((SkillScope::Shift(shift.shift.id.clone()), skill.clone()), var);

                    let mut expr = LinearExpr::term(var, 1);
                    for employee in &employees_sorted {
                        if !employee.skills.contains(skill) {
                            continue;
                        }
                        if let Some(&x) =
                            model.assignment.get(&(employee.id.clone(), shift.shift.id.clone()))
                        {
                            expr = expr.add_term(x, shift.duration_minutes);
                        }
                    }
                    if config.skills.enable_slack {
                        backend.add_linear_ge(expr, required_minutes);
                    } else {
                        backend.add_linear_ge(expr, required_minutes);
                        backend.add_linear_le(LinearExpr::term(var, 1), 0);
                    }
                    skill_total = skill_total.add_term(var, 1);
                }
            }
        }
    }
    model.objective_terms.insert("unmet_skill".to_string(), skill_total);

    // --- per-employee constraints (4, 5, 6, 7, 8, 9) ---------------------
    let min_rest_minutes_default = (config.rest.min_between_shifts * 60.0).round() as i64;
    let mut preferences_total = LinearExpr::default();
    let preference_lookup: HashMap<(&str, &str), f64> = inputs
        .preferences
        .iter()
        .map(|p| ((p.employee_id.as_str(), p.shift_id.as_str()), p.score))
        .collect();
    let mean_shift_minutes = if inputs.shifts.is_empty() {
        0
    } else {
        inputs.shifts.iter().map(|s| s.duration_minutes).sum::<i64>() / inputs.shifts.len() as i64
    };

    let mut overtime_total = LinearExpr::default();
    let mut external_use_total = LinearExpr::default();
    let mut contracted_overtime_vars: Vec<(String, VarId)> = Vec::new();

    for employee in &employees_sorted {
        let mut eligible_shifts = inputs.eligibility.eligible_shifts_for(&employee.id, inputs.shifts);
        eligible_shifts.sort_by(|a, b| a.shift.id.cmp(&b.shift.id));

        // worked = sum duration(s) * x[e,s]
        let mut worked = LinearExpr::default();
        for shift in &eligible_shifts {
            if let Some(&x) = model.assignment.get(&(employee.id.clone(), shift.shift.id.clone())) {
                worked = worked.add_term(x, shift.duration_minutes);
                if let Some(&score) = preference_lookup.get(&(employee.id.as_str(), shift.shift.id.as_str())) {
                    let coeff = (-score * mean_shift_minutes as f64).round() as i64;
                    preferences_total = preferences_total.add_term(x, coeff);
                }
            }
        }
        model.worked_expr.insert(employee.id.clone(), worked.clone());

        // Constraint 4: one shift per day per employee.
        let mut by_day: BTreeMap<NaiveDate, Vec<VarId>> = BTreeMap::new();
        for shift in &eligible_shifts {
            if let Some(&x) = model.assignment.get(&(employee.id.clone(), shift.shift.id.clone())) {
                by_day.entry(shift.shift.day).or_default().push(x);
            }
        }
        for vars in by_day.values() {
            if vars.len() > 1 {
                let mut expr = LinearExpr::default();
                for &v in vars {
                    expr = expr.add_term(v, 1);
                }
                backend.add_linear_le(expr, 1);
            }
        }

        // Constraint 5 + 6: night-shift chain ban and weekly cap.
        let night_shifts: Vec<&NormalizedShift> = eligible_shifts
            .iter()
            .copied()
            .filter(|s| s.shift.is_night())
            .collect();
        for i in 0..night_shifts.len() {
            for j in 0..night_shifts.len() {
                if i == j {
                    continue;
                }
                let (s1, s2) = (night_shifts[i], night_shifts[j]);
                if s2.shift.day == s1.shift.day.succ_opt().unwrap_or(s1.shift.day) {
                    if let (Some(&x1), Some(&x2)) = (
                        model.assignment.get(&(employee.id.clone(), s1.shift.id.clone())),
                        model.assignment.get(&(employee.id.clone(), s2.shift.id.clone())),
                    ) {
                        backend.add_linear_le(
                            LinearExpr::term(x1, 1).add_term(x2, 1),
                            1,
                        );
                    }
                }
            }
        }
        let mut night_by_week: BTreeMap<(i32, u32), Vec<VarId>> = BTreeMap::new();
        for shift in &night_shifts {
            if let Some(&x) = model.assignment.get(&(employee.id.clone(), shift.shift.id.clone())) {
                let iso = shift.shift.day.iso_week();
                night_by_week
                    .entry((iso.year(), iso.week()))
                    .or_default()
                    .push(x);
            }
        }
        for vars in night_by_week.values() {
            let mut expr = LinearExpr::default();
            for &v in vars {
                expr = expr.add_term(v, 1);
            }
            backend.add_linear_le(expr, 3);
        }

        // Constraint 7: minimum rest between any two assigned shifts.
        let rest_minutes = employee
            .min_rest_hours
            .map(|h| (h * 60.0).round() as i64)
            .unwrap_or(min_rest_minutes_default);
        for i in 0..eligible_shifts.len() {
            for j in (i + 1)..eligible_shifts.len() {
                let (s1, s2) = (eligible_shifts[i], eligible_shifts[j]);
                // Mirrors `_shifts_violate_rest`: two non-overlapping shifts
                // violate rest iff whichever comes first leaves too short a
                // gap before the other starts; shifts that overlap outright
                // (neither ends before the other starts) always violate it.
                let violates_rest = if s1.end_dt <= s2.start_dt {
                    (s2.start_dt - s1.end_dt).num_minutes() < rest_minutes
                } else if s2.end_dt <= s1.start_dt {
                    (s1.start_dt - s2.end_dt).num_minutes() < rest_minutes
                } else {
                    true
                };
                if violates_rest {
                    if let (Some(&x1), Some(&x2)) = (
                        model.assignment.get(&(employee.id.clone(), s1.shift.id.clone())),
                        model.assignment.get(&(employee.id.clone(), s2.shift.id.clone())),
                    ) {
                        backend.add_linear_le(LinearExpr::term(x1, 1).add_term(x2, 1), 1);
                    }
                }
            }
        }

        // Constraint 8: daily maximum hours, splitting overnight shifts
        // across the two calendar days they touch.
        let mut minutes_by_day: BTreeMap<NaiveDate, LinearExpr> = BTreeMap::new();
        for shift in &eligible_shifts {
            let Some(&x) = model.assignment.get(&(employee.id.clone(), shift.shift.id.clone())) else {
                continue;
            };
            if shift.crosses_midnight {
                let before_midnight = 1440 - shift.shift.start_min as i64;
                let after_midnight = shift.shift.end_min as i64;
                minutes_by_day
                    .entry(shift.shift.day)
                    .or_default()
                    .terms
                    .push((x, before_midnight));
                let next_day = shift.shift.day.succ_opt().unwrap_or(shift.shift.day);
                minutes_by_day
                    .entry(next_day)
                    .or_default()
                    .terms
                    .push((x, after_midnight));
            } else {
                minutes_by_day
                    .entry(shift.shift.day)
                    .or_default()
                    .terms
                    .push((x, shift.duration_minutes));
            }
        }
        let max_daily_minutes = (employee.max_daily_hours * 60.0).round() as i64;
        for expr in minutes_by_day.into_values() {
            backend.add_linear_le(expr, max_daily_minutes);
        }

        // Constraint 9: worker-type regime.
        if let Some(contracted_hours) = employee.contracted_hours {
            let contracted_minutes = (contracted_hours * 60.0).round() as i64;
            let max_overtime_minutes = (employee.max_overtime_hours * 60.0).round() as i64;
            let overtime_var = backend.new_int_var(
                0,
                max_overtime_minutes.max(0),
                &format!("overtime[{}]", employee.id),
            )?;
            model.overtime.insert(employee.id.clone(), overtime_var);
            contracted_overtime_vars.push((employee.id.clone(), overtime_var));

            let time_off_minutes: i64 = inputs
                .time_off
                .iter()
                .filter(|t| t.employee_id == employee.id)
                .map(|t| {
                    let (start, end) = t.effective_interval();
                    (end.saturating_sub(start)) as i64
                })
                .sum();

            // worked + time_off_minutes - overtime = contracted_minutes
            let expr = worked
                .clone()
                .add_term(overtime_var, -1)
                .add(LinearExpr::constant(time_off_minutes));
            backend.add_linear_eq(expr, contracted_minutes);

            overtime_total = overtime_total.add_term(overtime_var, role_cost_weight(employee, inputs.overtime_costs));
        } else {
            let use_ext = backend.new_bool_var(&format!("use_ext[{}]", employee.id));
            model.external_use.insert(employee.id.clone(), use_ext);

            let max_weekly_minutes = (config.hours.max_weekly * 60.0).round() as i64;
            let min_weekly_minutes = (config.hours.min_weekly * 60.0).round() as i64;

            // worked <= max_weekly * use_ext
            backend.add_linear_le(
                worked.clone().add_term(use_ext, -max_weekly_minutes),
                0,
            );
            // worked >= min_weekly * use_ext
            backend.add_linear_ge(
                worked.clone().add_term(use_ext, -min_weekly_minutes),
                0,
            );

            external_use_total = external_use_total.add(worked.clone());
        }
    }
    model.objective_terms.insert("overtime".to_string(), overtime_total);
    model
        .objective_terms
        .insert("external_use".to_string(), external_use_total);
    model
        .objective_terms
        .insert("preferences".to_string(), preferences_total);

    // Constraint 10: optional global overtime cap.
    if let Some(cap_hours) = config.hours.overtime_cap_weekly {
        let cap_minutes = (cap_hours * 60.0).round() as i64;
        let mut expr = LinearExpr::default();
        for &(_, var) in &contracted_overtime_vars {
            expr = expr.add_term(var, 1);
        }
        backend.add_linear_le(expr, cap_minutes);
    }

    // --- fairness: linearized absolute deviation from mean overtime ------
    let n = contracted_overtime_vars.len() as i64;
    let mut fairness_total = LinearExpr::default();
    if n > 0 {
        let mut total_overtime = LinearExpr::default();
        for &(_, var) in &contracted_overtime_vars {
            total_overtime = total_overtime.add_term(var, 1);
        }
        let deviation_bound: i64 = 1_000_000;
        for (employee_id, var) in &contracted_overtime_vars {
            let dev_pos = backend.new_int_var(0, deviation_bound, &format!("fair_over[{employee_id}]"))?;
            let dev_neg = backend.new_int_var(0, deviation_bound, &format!("fair_under[{employee_id}]"))?;
            // dev_pos - dev_neg = n * overtime[e] - total_overtime
            let expr = LinearExpr::term(*var, n)
                .add(total_overtime.clone().scale(-1))
                .add_term(dev_pos, -1)
                .add_term(dev_neg, 1);
            backend.add_linear_eq(expr, 0);
            fairness_total = fairness_total.add_term(dev_pos, 1).add_term(dev_neg, 1);
        }
    }
    model.fairness_divisor = n.max(1);
    model.objective_terms.insert("fairness".to_string(), fairness_total);

    Ok(model)
}

fn role_cost_weight(employee: &Employee, overtime_costs: &[OvertimeCost]) -> i64 {
    let mut roles: Vec<&String> = employee.roles.iter().collect();
    roles.sort();
    for role in roles {
        if let Some(cost) = overtime_costs.iter().find(|c| &c.role == role) {
            return cost.overtime_cost_per_hour.round() as i64;
        }
    }
    1
}

/// Assembles the single weighted-sum objective (spec §4.5 "weighted" mode):
/// each term's person-minute expression scaled by `penalty * 100`, with
/// `fairness` additionally divided by the employee count baked into its sum.
pub fn weighted_objective(model: &Model, config: &BuildConfig) -> LinearExpr {
    let mut total = LinearExpr::default();
    for key in &config.objective.priority {
        if let Some(expr) = model.objective_terms.get(key) {
            let weight = effective_weight(model, config, key);
            total = total.add(expr.clone().scale(weight));
        }
    }
    total
}

/// `term_weight` scaled down for `fairness`, whose raw expression sums
/// `N *` true deviation (see [`build_model`]'s fairness block).
pub(crate) fn effective_weight(model: &Model, config: &BuildConfig, key: &str) -> i64 {
    let weight = term_weight(config, key);
    if key == "fairness" {
        (weight / model.fairness_divisor).max(if weight > 0 { 1 } else { 0 })
    } else {
        weight
    }
}

fn term_weight(config: &BuildConfig, key: &str) -> i64 {
    let penalties = &config.penalties;
    let raw = match key {
        "unmet_window" => penalties.unmet_window,
        "unmet_demand" => penalties.unmet_demand,
        "unmet_skill" => penalties.unmet_skill,
        "overstaff" => penalties.overstaff,
        "overtime" => penalties.overtime,
        "fairness" => penalties.fairness,
        "preferences" => penalties.preferences,
        "external_use" => penalties.external_use,
        _ => 0.0,
    };
    (raw * 100.0).round() as i64
}

/// Drives a single weighted-objective solve (spec §4.5 state machine,
/// "weighted" branch).
pub fn solve_weighted<B: SolverBackend>(
    backend: &mut B,
    model: &Model,
    config: &BuildConfig,
    time_limit: Option<Duration>,
) -> SolveOutcome {
    debug_assert_eq!(config.objective.mode, ObjectiveMode::Weighted);
    let objective = weighted_objective(model, config);
    backend.set_objective(objective, ObjectiveSense::Minimize);
    backend.solve(time_limit)
}

/// Drives the lexicographic cascade (spec §4.5 "lex" branch): solves each
/// priority-ordered term in turn, locking its achieved value with a `<=`
/// constraint before moving to the next. Halts and returns the last feasible
/// outcome if any stage comes back infeasible or unknown.
pub fn solve_lex<B: SolverBackend>(
    backend: &mut B,
    model: &Model,
    config: &BuildConfig,
    time_limit: Option<Duration>,
) -> SolveOutcome {
    debug_assert_eq!(config.objective.mode, ObjectiveMode::Lex);
    let mut last_feasible: Option<SolveOutcome> = None;

    for key in &config.objective.priority {
        let Some(expr) = model.objective_terms.get(key) else {
            continue;
        };
        let weight = effective_weight(model, config, key);
        if weight == 0 {
            continue;
        }
        let weighted_expr = expr.clone().scale(weight);
        backend.set_objective(weighted_expr.clone(), ObjectiveSense::Minimize);
        let outcome = backend.solve(time_limit);

        match outcome.status {
            SolveStatus::Optimal | SolveStatus::Feasible => {
                if let Some(value) = outcome.objective_value {
                    backend.lock_previous_objective(weighted_expr, value);
                }
                last_feasible = Some(outcome);
            }
            SolveStatus::Infeasible | SolveStatus::Unknown => {
                return last_feasible.unwrap_or(outcome);
            }
        }
    }

    last_feasible.unwrap_or(SolveOutcome {
        status: SolveStatus::Infeasible,
        objective_value: None,
    })
}
