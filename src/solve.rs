//! Solver adapter (spec §4.5 state machine, §9 "solver as collaborator").
//!
//! The backend is expressed as a capability trait with the primitive
//! operations spec §9 names: create a boolean var, create an integer var in
//! a range, add a linear equality/inequality, set the objective, solve with
//! a time limit, read a variable's value. Swapping backends is then
//! mechanical — this module ships a dependency-free reference backend used
//! by the test suite, plus optional adapters over real MILP solvers
//! (`coin_cbc`, `highs`) behind Cargo features.

use std::time::Duration;

use crate::error::SolveError;

pub mod backend;

/// Opaque handle to a decision variable. Booleans are modeled as integer
/// variables with domain `{0, 1}`, the same convention CP-SAT itself uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// A linear expression `sum(coeff * var) + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, i64)>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coeff: i64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0,
        }
    }

    pub fn add_term(mut self, var: VarId, coeff: i64) -> Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn add(mut self, other: LinearExpr) -> Self {
        self.terms.extend(other.terms);
        self.constant += other.constant;
        self
    }

    pub fn scale(mut self, factor: i64) -> Self {
        for term in &mut self.terms {
            term.1 *= factor;
        }
        self.constant *= factor;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective_value: Option<i64>,
}

/// The capability a model builder needs from any CP/MILP backend.
pub trait SolverBackend {
    fn new_bool_var(&mut self, name: &str) -> VarId;
    fn new_int_var(&mut self, lb: i64, ub: i64, name: &str) -> Result<VarId, SolveError>;
    fn add_linear_eq(&mut self, expr: LinearExpr, rhs: i64);
    fn add_linear_le(&mut self, expr: LinearExpr, rhs: i64);
    fn add_linear_ge(&mut self, expr: LinearExpr, rhs: i64);
    fn set_objective(&mut self, expr: LinearExpr, sense: ObjectiveSense);
    fn solve(&mut self, time_limit: Option<Duration>) -> SolveOutcome;
    fn value_of(&self, var: VarId) -> i64;

    /// Locks the most recent objective's value with a `<=` constraint and
    /// clears it, used by the lexicographic cascade (spec §4.5) to move
    /// from one priority stage to the next.
    fn lock_previous_objective(&mut self, expr: LinearExpr, value: i64) {
        self.add_linear_le(expr, value);
    }
}
