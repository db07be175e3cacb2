//! [`SolverBackend`] adapter over the HiGHS MILP solver via the `highs`
//! crate, grounded on the same dependency in `christophcharles-Collomatique`
//! (see `DESIGN.md`).
//!
//! Unlike the `coin_cbc` adapter, `highs`'s `RowProblem` builder wants every
//! column's objective coefficient at the time the column is created, but
//! this trait's `set_objective` is called only after every variable already
//! exists. Rather than fight that ordering, variables/rows/objective are
//! buffered in our own representation and the real `RowProblem` is
//! materialized once, in `solve`.

use std::time::Duration;

use highs::{Col, HighsModelStatus, RowProblem, Sense};

use crate::error::SolveError;
use crate::solve::{LinearExpr, ObjectiveSense, SolveOutcome, SolveStatus, SolverBackend, VarId};

pub struct HighsBackend {
    bounds: Vec<(f64, f64)>,
    eq_rows: Vec<(LinearExpr, i64)>,
    le_rows: Vec<(LinearExpr, i64)>,
    ge_rows: Vec<(LinearExpr, i64)>,
    objective: Option<LinearExpr>,
    values: Vec<f64>,
}

impl HighsBackend {
    pub fn new() -> Self {
        Self {
            bounds: Vec::new(),
            eq_rows: Vec::new(),
            le_rows: Vec::new(),
            ge_rows: Vec::new(),
            objective: None,
            values: Vec::new(),
        }
    }

    fn row_terms(expr: &LinearExpr, cols: &[Col]) -> Vec<(Col, f64)> {
        expr.terms.iter().map(|(v, c)| (cols[v.0], *c as f64)).collect()
    }
}

impl Default for HighsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for HighsBackend {
    fn new_bool_var(&mut self, _name: &str) -> VarId {
        let id = VarId(self.bounds.len());
        self.bounds.push((0.0, 1.0));
        id
    }

    fn new_int_var(&mut self, lb: i64, ub: i64, _name: &str) -> Result<VarId, SolveError> {
        if lb > ub {
            return Err(SolveError::InvalidBounds { lb, ub });
        }
        let id = VarId(self.bounds.len());
        self.bounds.push((lb as f64, ub as f64));
        Ok(id)
    }

    fn add_linear_eq(&mut self, expr: LinearExpr, rhs: i64) {
        self.eq_rows.push((expr, rhs));
    }

    fn add_linear_le(&mut self, expr: LinearExpr, rhs: i64) {
        self.le_rows.push((expr, rhs));
    }

    fn add_linear_ge(&mut self, expr: LinearExpr, rhs: i64) {
        self.ge_rows.push((expr, rhs));
    }

    fn set_objective(&mut self, expr: LinearExpr, _sense: ObjectiveSense) {
        self.objective = Some(expr);
    }

    fn solve(&mut self, time_limit: Option<Duration>) -> SolveOutcome {
        let mut problem = RowProblem::default();
        let mut costs = vec![0.0f64; self.bounds.len()];
        if let Some(expr) = &self.objective {
            for (var, coeff) in &expr.terms {
                costs[var.0] += *coeff as f64;
            }
        }
        let cols: Vec<Col> = self
            .bounds
            .iter()
            .enumerate()
            .map(|(i, &(lb, ub))| problem.add_integer_column(costs[i], lb..=ub))
            .collect();

        for (expr, rhs) in &self.eq_rows {
            let bound = (*rhs - expr.constant) as f64;
            problem.add_row(bound..=bound, Self::row_terms(expr, &cols));
        }
        for (expr, rhs) in &self.le_rows {
            let bound = (*rhs - expr.constant) as f64;
            problem.add_row(f64::NEG_INFINITY..=bound, Self::row_terms(expr, &cols));
        }
        for (expr, rhs) in &self.ge_rows {
            let bound = (*rhs - expr.constant) as f64;
            problem.add_row(bound..=f64::INFINITY, Self::row_terms(expr, &cols));
        }

        let mut model = problem.optimise(Sense::Minimise);
        if let Some(limit) = time_limit {
            model.set_option("time_limit", limit.as_secs_f64());
        }
        let solved = model.solve();
        let status = solved.status();
        let solution = solved.get_solution();
        self.values = solution.columns().to_vec();

        let outcome_status = match status {
            HighsModelStatus::Optimal => SolveStatus::Optimal,
            HighsModelStatus::Infeasible => SolveStatus::Infeasible,
            _ => SolveStatus::Unknown,
        };
        let objective_value = matches!(outcome_status, SolveStatus::Optimal).then(|| {
            self.values
                .iter()
                .zip(costs.iter())
                .map(|(v, c)| v * c)
                .sum::<f64>()
                .round() as i64
        });

        SolveOutcome {
            status: outcome_status,
            objective_value,
        }
    }

    fn value_of(&self, var: VarId) -> i64 {
        self.values.get(var.0).copied().unwrap_or(0.0).round() as i64
    }
}
