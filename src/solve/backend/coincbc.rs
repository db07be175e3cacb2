//! [`SolverBackend`] adapter over the CBC MILP solver via the `coin_cbc`
//! crate, grounded on the dependency `christophcharles-Collomatique` carries
//! for the same purpose (see `DESIGN.md`).
//!
//! `coin_cbc::Model::solve` consumes the model by value, which doesn't fit
//! this trait's repeated-solve contract (the lexicographic cascade in
//! `crate::model::solve_lex` adds a locking constraint and solves again).
//! Like the `highs` adapter, variables/rows/objective are buffered in our
//! own representation and a fresh `coin_cbc::Model` is materialized on
//! every `solve` call.

use std::time::Duration;

use coin_cbc::{Col, Model as CbcModel, Sense};

use crate::error::SolveError;
use crate::solve::{LinearExpr, ObjectiveSense, SolveOutcome, SolveStatus, SolverBackend, VarId};

pub struct CoinCbcBackend {
    bounds: Vec<(f64, f64)>,
    eq_rows: Vec<(LinearExpr, i64)>,
    le_rows: Vec<(LinearExpr, i64)>,
    ge_rows: Vec<(LinearExpr, i64)>,
    objective: Option<LinearExpr>,
    values: Vec<f64>,
}

impl CoinCbcBackend {
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

    fn add_row(model: &mut CbcModel, cols: &[Col], expr: &LinearExpr, rhs: i64, lower: bool, upper: bool) {
        let bound = (rhs - expr.constant) as f64;
        let row = model.add_row();
        if lower {
            model.set_row_lower(row, bound);
        }
        if upper {
            model.set_row_upper(row, bound);
        }
        for (var, coeff) in &expr.terms {
            model.set_weight(row, cols[var.0], *coeff as f64);
        }
    }
}

impl Default for CoinCbcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for CoinCbcBackend {
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
        let mut model = CbcModel::default();
        let cols: Vec<Col> = self
            .bounds
            .iter()
            .map(|&(lb, ub)| {
                let col = model.add_col();
                model.set_col_lower(col, lb);
                model.set_col_upper(col, ub);
                model.set_integer(col);
                col
            })
            .collect();

        for (expr, rhs) in &self.eq_rows {
            Self::add_row(&mut model, &cols, expr, *rhs, true, true);
        }
        for (expr, rhs) in &self.le_rows {
            Self::add_row(&mut model, &cols, expr, *rhs, false, true);
        }
        for (expr, rhs) in &self.ge_rows {
            Self::add_row(&mut model, &cols, expr, *rhs, true, false);
        }

        model.set_obj_sense(Sense::Minimize);
        if let Some(expr) = &self.objective {
            for (var, coeff) in &expr.terms {
                model.set_obj_coeff(cols[var.0], *coeff as f64);
            }
        }
        if let Some(limit) = time_limit {
            model.set_parameter("sec", &limit.as_secs().to_string());
        }

        let solution = model.solve();
        let raw = solution.raw();

        let status = if raw.is_proven_optimal() {
            SolveStatus::Optimal
        } else if raw.is_proven_infeasible() {
            SolveStatus::Infeasible
        } else {
            SolveStatus::Unknown
        };
        let objective_value = matches!(status, SolveStatus::Optimal).then(|| raw.obj_value().round() as i64);

        self.values = cols.iter().map(|&col| solution.col(col)).collect();

        SolveOutcome {
            status,
            objective_value,
        }
    }

    fn value_of(&self, var: VarId) -> i64 {
        self.values.get(var.0).copied().unwrap_or(0.0).round() as i64
    }
}
