//! Process-wide defaults used when callers leave settings unspecified
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

pub struct Configuration {
    /// Default lower flux bound applied to reversible reactions
    pub lower_bound: f64,
    /// Default upper flux bound applied to reactions
    pub upper_bound: f64,
    /// Tolerance used for integrality rounding and zero comparisons
    pub tolerance: f64,
    /// Default solver backend
    pub solver: SolverChoice,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: SolverChoice::default(),
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverChoice {
    /// Use the pure-Rust microlp branch-and-bound solver,
    /// requires the microlp feature to be enabled
    Microlp,
    /// Use the SCIP mixed integer solver, requires the scip feature to be enabled
    Scip,
}

impl Default for SolverChoice {
    fn default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "microlp")] {
                SolverChoice::Microlp
            } else if #[cfg(feature = "scip")] {
                SolverChoice::Scip
            } else {
                compile_error!("at least one solver backend feature must be enabled")
            }
        }
    }
}
