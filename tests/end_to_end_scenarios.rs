//! Concrete end-to-end scenarios exercising the full build-then-solve
//! pipeline: normalize -> eligibility -> segments -> model -> solve ->
//! extract, against the reference backend.

use chrono::NaiveDate;

use shift_scheduling_core::config::{BuildConfig, CoverageSource, DemandMode};
use shift_scheduling_core::domain::{Employee, Shift, TimeOffEntry, Window};
use shift_scheduling_core::eligibility::build_eligibility;
use shift_scheduling_core::extract::{extract_assignments, extract_overtime, extract_segment_coverage};
use shift_scheduling_core::model::{build_model, solve_weighted, ModelInputs};
use shift_scheduling_core::normalize::normalize_shift;
use shift_scheduling_core::segment::{build_segments, SegmentBuilderOptions};
use shift_scheduling_core::solve::backend::reference::ReferenceBackend;
use shift_scheduling_core::solve::{SolverBackend, SolveStatus};

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

fn split_options() -> SegmentBuilderOptions {
    SegmentBuilderOptions {
        midnight_policy: shift_scheduling_core::config::MidnightPolicy::Split,
        merge_signatures: false,
        warn_slots_threshold: 0,
        hard_slots_threshold: 0,
    }
}

/// Scenario 1: a single qualified, available employee covers a single
/// matching shift and window with zero shortfall and zero objective.
///
/// `contracted_hours` is set to exactly the shift's own duration (8h) rather
/// than a round weekly figure, since the contracted regime's equality
/// constraint (worked + time_off - overtime == contracted) only clears to a
/// zero-cost solution when contracted hours match what's actually assigned.
#[test]
fn happy_path_single_employee_single_shift_zero_objective() {
    let employee = Employee::new("alice", "Alice")
        .with_role("Nurse")
        .with_skill("skillA")
        .with_contracted_hours(8.0);
    let shift = normalize_shift(
        Shift::new("S1", day(0), 480, 960, "Nurse", 1).with_skill_requirement("skillA", 1),
    )
    .unwrap();
    let window = Window::new("W1", day(0), 480, 960, "Nurse", 1);

    let eligibility = build_eligibility(&[employee.clone()], std::slice::from_ref(&shift), &[], &[]);
    let (segments, warnings) =
        build_segments(std::slice::from_ref(&shift), &[window.clone()], &split_options()).unwrap();
    assert!(warnings.is_empty());

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

    assert_eq!(outcome.status, SolveStatus::Optimal);
    assert_eq!(outcome.objective_value, Some(0));

    let assignments = extract_assignments(&backend, &model, &[shift]);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].employee_id, "alice");
    assert_eq!(assignments[0].shift_id, "S1");

    let coverage = extract_segment_coverage(&backend, &model, &segments);
    assert!(coverage.iter().all(|row| row.shortfall == 0 && row.overstaff == 0));
}

/// Scenario 2: the same inputs, but the employee's entire shift window is
/// blocked by time off. No one is eligible, so the demand goes fully unmet.
#[test]
fn time_off_blocks_eligibility_and_produces_full_shortfall() {
    let employee = Employee::new("alice", "Alice").with_role("Nurse").with_skill("skillA");
    let shift = normalize_shift(
        Shift::new("S1", day(0), 480, 960, "Nurse", 1).with_skill_requirement("skillA", 1),
    )
    .unwrap();
    let window = Window::new("W1", day(0), 480, 960, "Nurse", 1);
    let time_off = TimeOffEntry {
        employee_id: "alice".to_string(),
        day: day(0),
        start_min: Some(420),
        end_min: Some(1080),
        reason: None,
    };

    let eligibility = build_eligibility(
        &[employee.clone()],
        std::slice::from_ref(&shift),
        &[],
        &[time_off.clone()],
    );
    assert!(!eligibility.can_assign("alice", "S1"));

    let (segments, _) =
        build_segments(std::slice::from_ref(&shift), &[window.clone()], &split_options()).unwrap();

    let config = BuildConfig::default();
    let inputs = ModelInputs {
        employees: &[employee],
        shifts: &[shift.clone()],
        windows: &[window],
        eligibility: &eligibility,
        segments: &segments,
        time_off: &[time_off],
        overtime_costs: &[],
        preferences: &[],
    };

    let mut backend = ReferenceBackend::new();
    let model = build_model(&mut backend, &inputs, &config).unwrap();
    let outcome = solve_weighted(&mut backend, &model, &config, None);
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let assignments = extract_assignments(&backend, &model, &[shift]);
    assert!(assignments.is_empty());

    let coverage = extract_segment_coverage(&backend, &model, &segments);
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].shortfall, 480);
}

/// Scenario 3: two eligible nurses, one shift. Forcing the shift's aggregate
/// variable to 2 (both assigned) against a window demand of 1 produces
/// overstaff equal to the full segment's person-minutes.
#[test]
fn forced_double_assignment_produces_overstaff() {
    let e1 = Employee::new("e1", "E1").with_role("Nurse");
    let e2 = Employee::new("e2", "E2").with_role("Nurse");
    let shift = normalize_shift(Shift::new("S1", day(0), 480, 960, "Nurse", 1)).unwrap();
    let window = Window::new("W1", day(0), 480, 960, "Nurse", 1);

    let eligibility = build_eligibility(&[e1.clone(), e2.clone()], std::slice::from_ref(&shift), &[], &[]);
    let (segments, _) =
        build_segments(std::slice::from_ref(&shift), &[window.clone()], &split_options()).unwrap();

    let config = BuildConfig::default();
    let inputs = ModelInputs {
        employees: &[e1, e2],
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

    let y = model.shift_agg["S1"];
    backend.add_linear_eq(shift_scheduling_core::solve::LinearExpr::term(y, 1), 2);

    let outcome = solve_weighted(&mut backend, &model, &config, None);
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let assignments = extract_assignments(&backend, &model, &[shift]);
    assert_eq!(assignments.len(), 2);

    let coverage = extract_segment_coverage(&backend, &model, &segments);
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].shortfall, 0);
    assert_eq!(coverage[0].overstaff, 480);
}

/// Scenario 4: headcount and person-minutes modes agree on the resulting
/// segment demand, and a model built under either mode remains feasible,
/// when the window is exactly one segment wide.
#[test]
fn headcount_and_person_minutes_modes_agree_and_both_feasible() {
    let employee = Employee::new("alice", "Alice").with_role("Nurse").with_contracted_hours(4.0);
    let shift = normalize_shift(Shift::new("S1", day(0), 480, 720, "Nurse", 2)).unwrap();
    let window = Window::new("W1", day(0), 480, 720, "Nurse", 2);

    let solve_under = |mode: DemandMode| {
        let eligibility =
            build_eligibility(&[employee.clone()], std::slice::from_ref(&shift), &[], &[]);
        let (segments, _) =
            build_segments(std::slice::from_ref(&shift), &[window.clone()], &split_options()).unwrap();
        let mut config = BuildConfig::default();
        config.shifts.demand_mode = mode;
        let inputs = ModelInputs {
            employees: std::slice::from_ref(&employee),
            shifts: std::slice::from_ref(&shift),
            windows: std::slice::from_ref(&window),
            eligibility: &eligibility,
            segments: &segments,
            time_off: &[],
            overtime_costs: &[],
            preferences: &[],
        };
        let mut backend = ReferenceBackend::new();
        let model = build_model(&mut backend, &inputs, &config).unwrap();
        let outcome = solve_weighted(&mut backend, &model, &config, None);
        let coverage = extract_segment_coverage(&backend, &model, &segments);
        (outcome.status, coverage)
    };

    let (status_headcount, coverage_headcount) = solve_under(DemandMode::Headcount);
    let (status_minutes, coverage_minutes) = solve_under(DemandMode::PersonMinutes);

    assert_eq!(status_headcount, SolveStatus::Optimal);
    assert_eq!(status_minutes, SolveStatus::Optimal);
    assert_eq!(coverage_headcount.len(), 1);
    assert_eq!(coverage_minutes.len(), 1);
    // 2 persons * 240-minute segment, under both semantics since the window
    // exactly coincides with the single segment.
    assert_eq!(coverage_headcount[0].shortfall, coverage_minutes[0].shortfall);
    assert_eq!(coverage_headcount[0].overstaff, coverage_minutes[0].overstaff);
}

/// Scenario 5: one employee has two night shifts on consecutive days. The
/// night-chain ban limits her to at most one of the two, leaving the other
/// night's demand fully unmet.
#[test]
fn night_chain_ban_forces_shortfall_on_one_of_two_consecutive_nights() {
    let employee = Employee::new("e1", "E1").with_role("Nurse");
    let s1 = normalize_shift(Shift::new("S1", day(0), 22 * 60, 23 * 60, "Nurse", 1)).unwrap();
    let s2 = normalize_shift(Shift::new("S2", day(1), 22 * 60, 23 * 60, "Nurse", 1)).unwrap();
    assert!(s1.shift.is_night());
    assert!(s2.shift.is_night());

    let w1 = Window::new("W1", day(0), 22 * 60, 23 * 60, "Nurse", 1);
    let w2 = Window::new("W2", day(1), 22 * 60, 23 * 60, "Nurse", 1);

    let shifts = vec![s1, s2];
    let windows = vec![w1, w2];
    let eligibility = build_eligibility(&[employee.clone()], &shifts, &[], &[]);
    let (segments, _) = build_segments(&shifts, &windows, &split_options()).unwrap();

    let config = BuildConfig::default();
    let inputs = ModelInputs {
        employees: &[employee],
        shifts: &shifts,
        windows: &windows,
        eligibility: &eligibility,
        segments: &segments,
        time_off: &[],
        overtime_costs: &[],
        preferences: &[],
    };

    let mut backend = ReferenceBackend::new();
    let model = build_model(&mut backend, &inputs, &config).unwrap();
    let outcome = solve_weighted(&mut backend, &model, &config, None);
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let assignments = extract_assignments(&backend, &model, &shifts);
    assert_eq!(assignments.len(), 1, "night-chain ban allows at most one of the two");

    let coverage = extract_segment_coverage(&backend, &model, &segments);
    assert_eq!(coverage.len(), 2);
    let total_shortfall: i64 = coverage.iter().map(|row| row.shortfall).sum();
    assert_eq!(total_shortfall, 60, "the uncovered night's full 60 person-minutes go unmet");
    assert!(coverage.iter().any(|row| row.shortfall == 0));
    assert!(coverage.iter().any(|row| row.shortfall == 60));
}

/// Scenario 6: a contracted employee (32h/week, 6h max overtime) with six
/// available 8-hour shifts can only be assigned as many whole shifts as fit
/// the contracted-to-overtime-capped window; the equality constraint pins
/// overtime to exactly `worked - contracted_minutes`.
#[test]
fn contracted_employee_overtime_bounded_by_cap() {
    let mut employee = Employee::new("e1", "E1").with_role("Nurse").with_contracted_hours(32.0);
    employee.max_overtime_hours = 6.0;

    let shifts: Vec<_> = (0..6)
        .map(|i| normalize_shift(Shift::new(format!("S{i}"), day(i), 480, 960, "Nurse", 1)).unwrap())
        .collect();

    let eligibility = build_eligibility(&[employee.clone()], &shifts, &[], &[]);
    let (segments, _) = build_segments(&shifts, &[], &split_options()).unwrap();

    let mut config = BuildConfig::default();
    config.shifts.coverage_source = CoverageSource::Shifts;

    let inputs = ModelInputs {
        employees: &[employee],
        shifts: &shifts,
        windows: &[],
        eligibility: &eligibility,
        segments: &segments,
        time_off: &[],
        overtime_costs: &[],
        preferences: &[],
    };

    let mut backend = ReferenceBackend::new();
    let model = build_model(&mut backend, &inputs, &config).unwrap();
    let outcome = solve_weighted(&mut backend, &model, &config, None);
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let assignments = extract_assignments(&backend, &model, &shifts);
    let worked_minutes: i64 = assignments.iter().map(|a| (a.duration_hours * 60.0).round() as i64).sum();
    assert!((1920..=2280).contains(&worked_minutes), "worked={worked_minutes}");

    let overtime = extract_overtime(&backend, &model);
    assert_eq!(overtime.len(), 1);
    assert_eq!(overtime[0].overtime_minutes, worked_minutes - 1920);
}
