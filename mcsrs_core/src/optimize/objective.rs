//! Provides struct for representing an optimization problem's objective
use crate::optimize::expression::LinearExpr;

/// Represents the linear objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective
    pub(crate) terms: LinearExpr,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    pub(crate) sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: LinearExpr::new(),
            sense,
        }
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Add a new linear term to the objective
    pub fn add_linear_term(&mut self, variable: &str, coefficient: f64) {
        self.terms.push(variable, coefficient);
    }

    pub fn terms(&self) -> &LinearExpr {
        &self.terms
    }

    /// Whether any term has been added yet
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// The direction in which the objective should be optimized
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be made as large as possible
    Maximize,
    /// The objective should be made as small as possible
    Minimize,
}
