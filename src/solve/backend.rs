//! Concrete [`super::SolverBackend`] implementations.

pub mod reference;

#[cfg(feature = "coin_cbc")]
pub mod coincbc;

#[cfg(feature = "highs")]
pub mod highs;
