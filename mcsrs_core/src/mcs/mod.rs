//! Constrained minimal cut set enumeration
//!
//! Given a network's stoichiometry, reversibility flags, and one or more
//! target flux regions to eliminate, this module builds a single
//! mixed-integer model whose feasible binary assignments are exactly the
//! reaction knockout sets blocking every target (optionally while keeping
//! desired flux regions alive), and enumerates them smallest first.
pub mod dual;
pub mod enumerate;
pub mod milp;
pub mod verify;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::NetworkError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;

/// A set of reaction indices whose simultaneous knockout blocks all targets
///
/// Indices are stored sorted ascending and deduplicated, so two cut sets
/// over the same reactions compare equal regardless of discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CutSet {
    reactions: Vec<usize>,
}

impl CutSet {
    /// Build a cut set from reaction indices, normalizing order and duplicates
    pub fn new(mut reactions: Vec<usize>) -> Self {
        reactions.sort_unstable();
        reactions.dedup();
        CutSet { reactions }
    }

    pub fn reactions(&self) -> &[usize] {
        &self.reactions
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn contains(&self, reaction: usize) -> bool {
        self.reactions.binary_search(&reaction).is_ok()
    }

    /// Whether this cut set contains every reaction of `other`
    pub fn is_superset_of(&self, other: &CutSet) -> bool {
        other.reactions.iter().all(|r| self.contains(*r))
    }
}

impl From<&[usize]> for CutSet {
    fn from(reactions: &[usize]) -> Self {
        CutSet::new(reactions.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for CutSet {
    fn from(reactions: [usize; N]) -> Self {
        CutSet::new(reactions.to_vec())
    }
}

impl Display for CutSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.reactions.iter().map(|r| r.to_string()).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Errors raised by cut-set construction and enumeration
///
/// Configuration problems surface here immediately at construction or call
/// time; transient solver failures during enumeration never do (the engine
/// stops cleanly and reports them through the enumeration status instead).
#[derive(Error, Debug)]
pub enum McsError {
    /// Big-M linking was disabled but the backend can't enforce indicators
    #[error("big-M is disabled (bigM = 0) but solver `{0}` lacks indicator constraint support")]
    IndicatorUnsupported(&'static str),
    /// Solution-pool enumeration was requested on a backend without pools
    #[error("populate enumeration requested but solver `{0}` does not support solution pools")]
    PopulateUnsupported(&'static str),
    /// Knock-in reactions were supplied; their semantics are not implemented
    #[error("knock-in reactions are accepted by the interface but not implemented")]
    KnockInUnimplemented,
    /// A matrix or vector input does not match the network dimensions
    #[error("dimension mismatch: {0}")]
    Dimension(String),
    /// An input region or network failed validation
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The model rejected a variable or constraint while assembling
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// A solver capability or backend error outside enumeration recovery
    #[error(transparent)]
    Solver(#[from] SolverError),
}
