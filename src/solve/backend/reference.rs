//! A dependency-free reference backend used by the test suite and as a
//! working default. Deterministic given the fixed enumeration order spec §5
//! requires; not meant to scale — see `DESIGN.md`.
//!
//! Strategy: exhaustively enumerate the boolean decision variables (the
//! true degrees of freedom in this model family — assignment pairs and
//! external-use indicators), then resolve every integer variable by
//! propagating the model's definitional equalities:
//!
//! - an equality with exactly one unresolved variable at coefficient ±1
//!   is solved directly (`y[s] = sum_e x[e,s]`, overtime ties, ...);
//! - the canonical coverage-slack pattern `known + short - over = target`
//!   (one unresolved var at `+1`, one at `-1`) is resolved to the tightest
//!   feasible pair, which is what an LP relaxation converges to whenever
//!   both slacks carry a non-negative objective weight (always true here).
//!
//! Any variable still unresolved after the propagation fixpoint is pinned
//! to its lower bound. Enumeration is capped; past the cap the best
//! incumbent found so far (if any) is returned with [`SolveStatus::Unknown`].

use std::time::Duration;

use crate::error::SolveError;
use crate::solve::{LinearExpr, ObjectiveSense, SolveOutcome, SolveStatus, SolverBackend, VarId};

const MAX_ENUMERATED_COMBINATIONS: u64 = 1 << 20;

#[derive(Debug, Clone, Copy)]
struct VarSpec {
    lb: i64,
    ub: i64,
    is_bool: bool,
}

/// The reference [`SolverBackend`].
pub struct ReferenceBackend {
    specs: Vec<VarSpec>,
    names: Vec<String>,
    eqs: Vec<(LinearExpr, i64)>,
    les: Vec<(LinearExpr, i64)>,
    ges: Vec<(LinearExpr, i64)>,
    objective: Option<(LinearExpr, ObjectiveSense)>,
    best_values: Option<Vec<i64>>,
    best_objective: Option<i64>,
}

impl ReferenceBackend {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            names: Vec::new(),
            eqs: Vec::new(),
            les: Vec::new(),
            ges: Vec::new(),
            objective: None,
            best_values: None,
            best_objective: None,
        }
    }

    fn bool_var_indices(&self) -> Vec<usize> {
        self.specs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_bool)
            .map(|(i, _)| i)
            .collect()
    }

    fn eval(expr: &LinearExpr, values: &[Option<i64>]) -> Option<i64> {
        let mut total = expr.constant;
        for (var, coeff) in &expr.terms {
            total += coeff * values[var.0]?;
        }
        Some(total)
    }

    /// Tries to resolve unresolved variables in `expr == rhs` given the
    /// current partial assignment. Returns true if it made progress.
    fn propagate_eq(expr: &LinearExpr, rhs: i64, values: &mut [Option<i64>]) -> bool {
        let mut known = 0i64;
        let mut unresolved: Vec<(VarId, i64)> = Vec::new();
        for (var, coeff) in &expr.terms {
            match values[var.0] {
                Some(v) => known += coeff * v,
                None => unresolved.push((*var, *coeff)),
            }
        }
        let target = rhs - expr.constant - known;
        match unresolved.as_slice() {
            [] => false,
            [(var, coeff)] if coeff.abs() == 1 => {
                let value = target / coeff;
                if value * coeff == target {
                    values[var.0] = Some(value);
                    true
                } else {
                    false
                }
            }
            [(pos_var, 1), (neg_var, -1)] | [(neg_var, -1), (pos_var, 1)] => {
                let pos_value = target.max(0);
                let neg_value = (-target).max(0);
                values[pos_var.0] = Some(pos_value);
                values[neg_var.0] = Some(neg_value);
                true
            }
            _ => false,
        }
    }

    fn resolve(&self, mut values: Vec<Option<i64>>) -> Option<Vec<i64>> {
        let mut progressed = true;
        while progressed {
            progressed = false;
            for (expr, rhs) in &self.eqs {
                if Self::propagate_eq(expr, *rhs, &mut values) {
                    progressed = true;
                }
            }
        }
        for (i, spec) in self.specs.iter().enumerate() {
            if values[i].is_none() {
                values[i] = Some(spec.lb);
            }
        }
        let resolved: Vec<i64> = values.into_iter().map(|v| v.unwrap())
            .collect();

        for (i, spec) in self.specs.iter().enumerate() {
            if resolved[i] < spec.lb || resolved[i] > spec.ub {
                return None;
            }
        }
        for (expr, rhs) in &self.eqs {
            let values_some: Vec<Option<i64>> = resolved.iter().map(|v| Some(*v)).collect();
            if Self::eval(expr, &values_some) != Some(*rhs) {
                return None;
            }
        }
        for (expr, rhs) in &self.les {
            let values_some: Vec<Option<i64>> = resolved.iter().map(|v| Some(*v)).collect();
            if Self::eval(expr, &values_some).map(|v| v > *rhs).unwrap_or(true) {
                return None;
            }
        }
        for (expr, rhs) in &self.ges {
            let values_some: Vec<Option<i64>> = resolved.iter().map(|v| Some(*v)).collect();
            if Self::eval(expr, &values_some).map(|v| v < *rhs).unwrap_or(true) {
                return None;
            }
        }
        Some(resolved)
    }

    fn objective_value(&self, values: &[i64]) -> i64 {
        match &self.objective {
            Some((expr, ObjectiveSense::Minimize)) => {
                let values_some: Vec<Option<i64>> = values.iter().map(|v| Some(*v)).collect();
                Self::eval(expr, &values_some).unwrap_or(0)
            }
            None => 0,
        }
    }
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for ReferenceBackend {
    fn new_bool_var(&mut self, name: &str) -> VarId {
        let id = VarId(self.specs.len());
        self.specs.push(VarSpec {
            lb: 0,
            ub: 1,
            is_bool: true,
        });
        self.names.push(name.to_string());
        id
    }

    fn new_int_var(&mut self, lb: i64, ub: i64, name: &str) -> Result<VarId, SolveError> {
        if lb > ub {
            return Err(SolveError::InvalidBounds { lb, ub });
        }
        let id = VarId(self.specs.len());
        self.specs.push(VarSpec {
            lb,
            ub,
            is_bool: false,
        });
        self.names.push(name.to_string());
        Ok(id)
    }

    fn add_linear_eq(&mut self, expr: LinearExpr, rhs: i64) {
        self.eqs.push((expr, rhs));
    }

    fn add_linear_le(&mut self, expr: LinearExpr, rhs: i64) {
        self.les.push((expr, rhs));
    }

    fn add_linear_ge(&mut self, expr: LinearExpr, rhs: i64) {
        self.ges.push((expr, rhs));
    }

    fn set_objective(&mut self, expr: LinearExpr, sense: ObjectiveSense) {
        self.objective = Some((expr, sense));
    }

    fn solve(&mut self, _time_limit: Option<Duration>) -> SolveOutcome {
        let bool_vars = self.bool_var_indices();
        let combos: u64 = 1u64 << bool_vars.len().min(63);
        let truncated = bool_vars.len() >= 63 || combos > MAX_ENUMERATED_COMBINATIONS;
        let limit = combos.min(MAX_ENUMERATED_COMBINATIONS);

        self.best_values = None;
        self.best_objective = None;

        for mask in 0..limit {
            let mut values: Vec<Option<i64>> = vec![None; self.specs.len()];
            for (bit, &idx) in bool_vars.iter().enumerate() {
                values[idx] = Some(((mask >> bit) & 1) as i64);
            }
            if let Some(resolved) = self.resolve(values) {
                let obj = self.objective_value(&resolved);
                if self.best_objective.map(|b| obj < b).unwrap_or(true) {
                    self.best_objective = Some(obj);
                    self.best_values = Some(resolved);
                }
            }
        }

        match (&self.best_values, truncated) {
            (Some(_), false) => SolveOutcome {
                status: SolveStatus::Optimal,
                objective_value: self.best_objective,
            },
            (Some(_), true) => SolveOutcome {
                status: SolveStatus::Unknown,
                objective_value: self.best_objective,
            },
            (None, true) => SolveOutcome {
                status: SolveStatus::Unknown,
                objective_value: None,
            },
            (None, false) => SolveOutcome {
                status: SolveStatus::Infeasible,
                objective_value: None,
            },
        }
    }

    fn value_of(&self, var: VarId) -> i64 {
        self.best_values
            .as_ref()
            .map(|values| values[var.0])
            .unwrap_or(0)
    }
}
