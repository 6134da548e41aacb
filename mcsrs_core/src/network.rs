//! Input-side representation of a metabolic network and flux-space regions
//!
//! The cut-set core consumes exactly what this module holds: a sparse
//! stoichiometric matrix, per-reaction reversibility/cuttability flags and
//! flux bounds, target regions to block, and desired regions to preserve.
use derive_builder::Builder;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CooMatrix;
use thiserror::Error;

use crate::configuration::CONFIGURATION;

/// Represents a reaction in the metabolic network
#[derive(Builder, Debug, Clone)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Whether the reaction can carry negative flux
    #[builder(default = "false")]
    pub reversible: bool,
    /// Whether the reaction is eligible for knockout; irrepressible
    /// reactions (spontaneous, boundary) carry `false`
    #[builder(default = "true")]
    pub cuttable: bool,
    /// Lower flux bound, `None` when unbounded below
    #[builder(default = "Some(CONFIGURATION.read().unwrap().lower_bound)")]
    pub lower_bound: Option<f64>,
    /// Upper flux bound, `None` when unbounded above
    #[builder(default = "Some(CONFIGURATION.read().unwrap().upper_bound)")]
    pub upper_bound: Option<f64>,
}

impl Reaction {
    /// Lower bound the reaction's flux variable gets in a flux system;
    /// irreversible reactions never go below zero
    pub fn flux_lower_bound(&self) -> Option<f64> {
        if self.reversible {
            self.lower_bound
        } else {
            Some(self.lower_bound.unwrap_or(0.).max(0.))
        }
    }

    /// Upper bound the reaction's flux variable gets in a flux system
    pub fn flux_upper_bound(&self) -> Option<f64> {
        self.upper_bound
    }
}

/// A metabolic network: stoichiometry plus the reaction list
///
/// Row `i` of the stoichiometric matrix is metabolite `i`'s mass balance,
/// column `j` belongs to `reactions[j]`.
#[derive(Debug, Clone)]
pub struct Network {
    stoichiometry: CooMatrix<f64>,
    reactions: Vec<Reaction>,
}

impl Network {
    /// Create a network, checking that the matrix has one column per reaction
    pub fn new(stoichiometry: CooMatrix<f64>, reactions: Vec<Reaction>) -> Result<Self, NetworkError> {
        if stoichiometry.ncols() != reactions.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: reactions.len(),
                found: stoichiometry.ncols(),
                what: "stoichiometry columns",
            });
        }
        Ok(Network {
            stoichiometry,
            reactions,
        })
    }

    pub fn stoichiometry(&self) -> &CooMatrix<f64> {
        &self.stoichiometry
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn num_metabolites(&self) -> usize {
        self.stoichiometry.nrows()
    }

    /// Per-reaction reversibility flags, in column order
    pub fn reversibility(&self) -> Vec<bool> {
        self.reactions.iter().map(|r| r.reversible).collect()
    }

    /// Per-reaction cuttability flags, in column order
    pub fn cuttable(&self) -> Vec<bool> {
        self.reactions.iter().map(|r| r.cuttable).collect()
    }
}

/// A forbidden region of flux space: every flux vector with
/// `matrix @ v <= rhs` must be blocked by the cut set
#[derive(Debug, Clone)]
pub struct TargetRegion {
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl TargetRegion {
    pub fn new(matrix: DMatrix<f64>, rhs: DVector<f64>) -> Result<Self, NetworkError> {
        if matrix.nrows() != rhs.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: matrix.nrows(),
                found: rhs.len(),
                what: "target right-hand side",
            });
        }
        Ok(TargetRegion { matrix, rhs })
    }

    pub fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }
}

/// A flux-space region that must stay feasible after the cut, with its own
/// per-reaction flux bounds (`None` sides are unbounded)
#[derive(Debug, Clone)]
pub struct DesiredRegion {
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
    pub lower_bounds: Vec<Option<f64>>,
    pub upper_bounds: Vec<Option<f64>>,
}

impl DesiredRegion {
    pub fn new(
        matrix: DMatrix<f64>,
        rhs: DVector<f64>,
        lower_bounds: Vec<Option<f64>>,
        upper_bounds: Vec<Option<f64>>,
    ) -> Result<Self, NetworkError> {
        if matrix.nrows() != rhs.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: matrix.nrows(),
                found: rhs.len(),
                what: "desired right-hand side",
            });
        }
        if lower_bounds.len() != matrix.ncols() || upper_bounds.len() != matrix.ncols() {
            return Err(NetworkError::ShapeMismatch {
                expected: matrix.ncols(),
                found: lower_bounds.len().min(upper_bounds.len()),
                what: "desired flux bounds",
            });
        }
        Ok(DesiredRegion {
            matrix,
            rhs,
            lower_bounds,
            upper_bounds,
        })
    }
}

/// Errors raised while assembling network inputs
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: usize,
        found: usize,
        what: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_builder_defaults() {
        let reaction = ReactionBuilder::default().id("R1").build().unwrap();
        assert!(!reaction.reversible);
        assert!(reaction.cuttable);
        assert_eq!(reaction.lower_bound, Some(-1000.));
        assert_eq!(reaction.upper_bound, Some(1000.));
        // irreversible reactions never get a negative flux lower bound
        assert_eq!(reaction.flux_lower_bound(), Some(0.));
    }

    #[test]
    fn network_shape_is_checked() {
        let mut st = CooMatrix::new(1, 2);
        st.push(0, 0, 1.);
        st.push(0, 1, -1.);
        let reactions = vec![ReactionBuilder::default().id("R1").build().unwrap()];
        assert!(matches!(
            Network::new(st, reactions),
            Err(NetworkError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn target_shape_is_checked() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1., 0., 0., 1.]);
        let rhs = DVector::from_vec(vec![1.]);
        assert!(TargetRegion::new(matrix, rhs).is_err());
    }
}
