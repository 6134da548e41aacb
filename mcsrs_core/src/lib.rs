//! # mcsrs_core
//! `mcsrs_core` enumerates constrained minimal cut sets of metabolic
//! networks: smallest-possible reaction knockout sets that make every
//! given target flux region infeasible, optionally while keeping desired
//! flux regions alive.
//!
//! The enumeration works on a single mixed-integer model. Each target
//! region is turned into its Farkas dual, whose certificate variables are
//! gated behind per-reaction knockout binaries (big-M rows or native
//! indicator constraints), so a feasible binary assignment is exactly a
//! cut set. Minimizing the number of active binaries and excluding each
//! solution as it is found yields the cut sets smallest first.
//!
//! ```no_run
//! use mcsrs_core::mcs::enumerate::{EnumerationLimits, McsEnumerator};
//! use mcsrs_core::mcs::milp::{assemble, McsOptionsBuilder};
//! use mcsrs_core::network::{Network, ReactionBuilder, TargetRegion};
//! use mcsrs_core::optimize::solvers::default_solver;
//! use nalgebra::{DMatrix, DVector};
//! use nalgebra_sparse::CooMatrix;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut st = CooMatrix::new(1, 2);
//! st.push(0, 0, 1.);
//! st.push(0, 1, -1.);
//! let network = Network::new(
//!     st,
//!     vec![
//!         ReactionBuilder::default().id("src").build()?,
//!         ReactionBuilder::default().id("sink").build()?,
//!     ],
//! )?;
//! // block every flux distribution with at least one unit through src
//! let target = TargetRegion::new(
//!     DMatrix::from_row_slice(1, 2, &[-1., 0.]),
//!     DVector::from_vec(vec![-1.]),
//! )?;
//! let options = McsOptionsBuilder::default().big_m(1000.).build()?;
//! let milp = assemble(&network, &[target], &[], &options)?;
//! let mut engine = McsEnumerator::new(milp, default_solver())?;
//! let result = engine.enumerate(&EnumerationLimits::default())?;
//! for cut_set in &result.cut_sets {
//!     println!("{}", cut_set);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Solver backends
//! Backends are selected by cargo feature and at runtime through the
//! global [`configuration::CONFIGURATION`]. The default `microlp` backend
//! is pure Rust and needs no system libraries, but only supports big-M
//! gating; the `scip` feature adds a backend with native indicator
//! constraints and per-solve time limits.

pub mod configuration;
pub mod mcs;
pub mod network;
pub mod optimize;

pub use crate::mcs::enumerate::{
    Enumeration, EnumerationLimits, EnumerationLimitsBuilder, EnumerationMethod,
    EnumerationStatus, McsEnumerator,
};
pub use crate::mcs::milp::{assemble, McsMilp, McsOptions, McsOptionsBuilder};
pub use crate::mcs::{CutSet, McsError};
pub use crate::network::{
    DesiredRegion, Network, NetworkError, Reaction, ReactionBuilder, TargetRegion,
};
