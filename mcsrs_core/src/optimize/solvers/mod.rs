//! Solver backends and the capability trait they implement
//!
//! The cut-set core never talks to a concrete solver: it only consumes
//! this trait. Capability probes (`supports_indicator_constraints`,
//! `supports_populate`) exist so that configuration mismatches surface as
//! construction-time errors instead of failures deep inside enumeration.
#[cfg(feature = "microlp")]
pub mod microlp;

#[cfg(feature = "scip")]
pub mod scip;

use std::time::Duration;

use thiserror::Error;

use crate::configuration::{SolverChoice, CONFIGURATION};
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

/// A backend capable of solving the mixed-integer models built by this crate
///
/// Infeasibility and unboundedness are reported as statuses inside
/// [`ProblemSolution`], not as errors; `Err` is reserved for capability
/// gaps and genuine backend failures.
pub trait Solver {
    /// Short backend name, used in error messages and diagnostics
    fn name(&self) -> &'static str;

    /// Whether the backend can enforce native indicator constraints
    fn supports_indicator_constraints(&self) -> bool;

    /// Whether the backend can harvest a pool of solutions in one call
    fn supports_populate(&self) -> bool;

    /// Solve the problem, optionally under a per-solve wall-time budget
    fn solve(
        &mut self,
        problem: &Problem,
        time_limit: Option<Duration>,
    ) -> Result<ProblemSolution, SolverError>;

    /// Collect every optimal-objective solution of the problem
    ///
    /// `pool_over` names the binary variables that distinguish solutions:
    /// two solutions agreeing on all of them count as one. Backends
    /// without pool support must return [`SolverError::PopulateUnsupported`].
    fn populate(
        &mut self,
        _problem: &Problem,
        _pool_over: &[String],
        _time_limit: Option<Duration>,
    ) -> Result<Vec<ProblemSolution>, SolverError> {
        Err(SolverError::PopulateUnsupported(self.name()))
    }
}

/// Errors raised by solver backends
#[derive(Error, Debug)]
pub enum SolverError {
    /// The model contains indicator constraints the backend can't enforce
    #[error("solver `{0}` does not support indicator constraints")]
    IndicatorUnsupported(&'static str),
    /// The backend has no solution-pool capability
    #[error("solver `{0}` does not support solution pools")]
    PopulateUnsupported(&'static str),
    /// A transient backend failure; enumeration stops cleanly on these
    #[error("solver backend failure: {0}")]
    Backend(String),
}

/// Instantiate the solver backend selected in the global configuration
pub fn default_solver() -> Box<dyn Solver> {
    create_solver(CONFIGURATION.read().unwrap().solver)
}

/// Instantiate a solver backend by choice
///
/// # Panics
/// Panics if the chosen backend's cargo feature is not enabled.
pub fn create_solver(choice: SolverChoice) -> Box<dyn Solver> {
    match choice {
        SolverChoice::Microlp => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "microlp")] {
                    Box::new(microlp::MicrolpSolver::new())
                } else {
                    panic!("the microlp feature is not enabled")
                }
            }
        }
        SolverChoice::Scip => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "scip")] {
                    Box::new(scip::ScipSolver::new())
                } else {
                    panic!("the scip feature is not enabled")
                }
            }
        }
    }
}
