//! Provides struct representing an optimization problem
//!
//! A [`Problem`] is the persistent model the enumeration engine mutates
//! across iterations. The mutation surface is deliberately append-only:
//! constraints can be added and an inequality's lower bound can be raised,
//! but nothing is ever removed or loosened, so a backend that warm-starts
//! from a previous solve stays valid.
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::expression::LinearExpr;
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::variable::{Variable, VariableType};

/// An optimization problem
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        variable.index = self.variables.len();
        if variable.variable_type != VariableType::Continuous {
            self.problem_type = ProblemType::LinearMixedInteger;
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
    ) -> Result<(), ProblemError> {
        self.add_variable(Variable {
            id: id.to_string(),
            name: None,
            variable_type,
            lower_bound,
            upper_bound,
            index: 0,
        })
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem under the given id
    pub fn add_constraint(&mut self, id: &str, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(id, &constraint)?;
        self.constraints.insert(id.to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the model
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        terms: LinearExpr,
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(id, Constraint::new_equality(terms, equals))
    }

    /// Create a new inequality constraint and add it to the model
    ///
    /// `None` on either side leaves that side unbounded.
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        terms: LinearExpr,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
    ) -> Result<(), ProblemError> {
        self.add_constraint(
            id,
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            },
        )
    }
    // endregion Adding Constraints

    // region Objective
    /// Add a new linear term to the objective
    pub fn add_new_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.variables.contains_key(variable_id) {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        self.objective.add_linear_term(variable_id, coefficient);
        Ok(())
    }

    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }
    // endregion Objective

    // region Mutation
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
    ) -> Result<(), ProblemError> {
        if let (Some(lb), Some(ub)) = (lower_bound, upper_bound) {
            if lb > ub {
                return Err(ProblemError::InvalidVariableBounds);
            }
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ProblemError::NonExistentVariable),
        }
    }

    /// Raise the lower bound of an existing inequality constraint
    ///
    /// Lowering the bound is rejected: once enumeration has proven no
    /// solution exists below a size, relaxing the constraint would
    /// invalidate both the proof and the backend's warm-start state.
    pub fn tighten_inequality_lower_bound(
        &mut self,
        id: &str,
        lower_bound: f64,
    ) -> Result<(), ProblemError> {
        match self.constraints.get_mut(id) {
            Some(Constraint::Inequality {
                lower_bound: lb, ..
            }) => {
                if let Some(current) = lb {
                    if lower_bound < *current {
                        return Err(ProblemError::LoosenedConstraint);
                    }
                }
                *lb = Some(lower_bound);
                Ok(())
            }
            Some(_) => Err(ProblemError::NotAnInequality),
            None => Err(ProblemError::NonExistentConstraint),
        }
    }
    // endregion Mutation

    // region Accessors
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn problem_type(&self) -> &ProblemType {
        &self.problem_type
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .values()
            .any(|v| v.variable_type != VariableType::Continuous)
    }

    pub fn has_indicator_constraints(&self) -> bool {
        self.constraints.values().any(|c| c.is_indicator())
    }
    // endregion Accessors

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists);
        }
        if let (Some(lb), Some(ub)) = (variable.lower_bound, variable.upper_bound) {
            if lb > ub {
                return Err(ProblemError::InvalidVariableBounds);
            }
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, id: &str, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists);
        }
        if let Constraint::Inequality {
            lower_bound: Some(lb),
            upper_bound: Some(ub),
            ..
        } = constraint
        {
            if lb > ub {
                return Err(ProblemError::InvalidConstraintBounds);
            }
        }
        for var_id in constraint.variable_ids() {
            if !self.variables.contains_key(var_id) {
                return Err(ProblemError::NonExistentVariablesInConstraint);
            }
        }
        if let Constraint::Indicator { indicator, .. } = constraint {
            // guaranteed present by the loop above
            if self.variables[indicator.as_str()].variable_type != VariableType::Binary {
                return Err(ProblemError::NonBinaryIndicator);
            }
        }
        Ok(())
    }
    // endregion Validation Functions

    // region LP Export
    /// Render the model in CPLEX LP text format for offline inspection
    ///
    /// Indicator constraints use the CPLEX `->` syntax. Every backend gets
    /// this export for free, nothing branches on the concrete solver.
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();
        let sense = match self.objective.sense() {
            ObjectiveSense::Minimize => "Minimize",
            ObjectiveSense::Maximize => "Maximize",
        };
        let _ = writeln!(out, "{}", sense);
        let _ = writeln!(out, " obj: {}", render_lp_terms(self.objective.terms()));
        let _ = writeln!(out, "Subject To");
        for (id, constraint) in &self.constraints {
            match constraint {
                Constraint::Equality { terms, equals } => {
                    let _ = writeln!(out, " {}: {} = {}", id, render_lp_terms(terms), equals);
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                } => {
                    // a range row is exported as two one-sided rows
                    if let Some(ub) = upper_bound {
                        let _ = writeln!(out, " {}: {} <= {}", id, render_lp_terms(terms), ub);
                    }
                    if let Some(lb) = lower_bound {
                        let suffix = if upper_bound.is_some() { "_lb" } else { "" };
                        let _ =
                            writeln!(out, " {}{}: {} >= {}", id, suffix, render_lp_terms(terms), lb);
                    }
                }
                Constraint::Indicator {
                    indicator,
                    active_value,
                    terms,
                    upper_bound,
                } => {
                    let _ = writeln!(
                        out,
                        " {}: {} = {} -> {} <= {}",
                        id,
                        indicator,
                        u8::from(*active_value),
                        render_lp_terms(terms),
                        upper_bound
                    );
                }
            }
        }
        let _ = writeln!(out, "Bounds");
        for variable in self.variables.values() {
            if variable.variable_type == VariableType::Binary {
                continue;
            }
            match (variable.lower_bound, variable.upper_bound) {
                (None, None) => {
                    let _ = writeln!(out, " {} free", variable.id);
                }
                (Some(lb), None) => {
                    let _ = writeln!(out, " {} >= {}", variable.id, lb);
                }
                (None, Some(ub)) => {
                    let _ = writeln!(out, " -inf <= {} <= {}", variable.id, ub);
                }
                (Some(lb), Some(ub)) => {
                    let _ = writeln!(out, " {} <= {} <= {}", lb, variable.id, ub);
                }
            }
        }
        let binaries: Vec<&str> = self
            .variables
            .values()
            .filter(|v| v.variable_type == VariableType::Binary)
            .map(|v| v.id.as_str())
            .collect();
        if !binaries.is_empty() {
            let _ = writeln!(out, "Binaries");
            let _ = writeln!(out, " {}", binaries.join(" "));
        }
        let generals: Vec<&str> = self
            .variables
            .values()
            .filter(|v| v.variable_type == VariableType::Integer)
            .map(|v| v.id.as_str())
            .collect();
        if !generals.is_empty() {
            let _ = writeln!(out, "Generals");
            let _ = writeln!(out, " {}", generals.join(" "));
        }
        let _ = writeln!(out, "End");
        out
    }

    /// Write the LP text rendering of the model to a file
    pub fn write_lp(&self, path: &Path) -> Result<(), ProblemError> {
        fs::write(path, self.to_lp_string()).map_err(ProblemError::LpExport)
    }
    // endregion LP Export
}

/// Render an expression in LP format (explicit signs, no leading `+`)
fn render_lp_terms(terms: &LinearExpr) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    let mut out = String::new();
    for (i, (var, coef)) in terms.iter().enumerate() {
        if i == 0 {
            if coef < 0. {
                let _ = write!(out, "- ");
            }
        } else if coef < 0. {
            let _ = write!(out, " - ");
        } else {
            let _ = write!(out, " + ");
        }
        let _ = write!(out, "{} {}", coef.abs(), var);
    }
    out
}

/// Types of optimization problems
#[derive(Clone, Debug, PartialEq)]
pub enum ProblemType {
    /// Problem with linear objective and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable")]
    VariableIdAlreadyExists,
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add a variable with lower_bound>upper_bound")]
    InvalidVariableBounds,
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint")]
    ConstraintAlreadyExists,
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add an inequality constraint with lower_bound > upper_bound")]
    InvalidConstraintBounds,
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add a constraint with variables not in the model")]
    NonExistentVariablesInConstraint,
    /// Error when the controlling variable of an indicator constraint is not binary
    #[error("Indicator constraints require a binary controlling variable")]
    NonBinaryIndicator,
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
    /// Error when trying to perform an update on a variable that doesn't exist
    #[error("Tried to access a variable that doesn't exist")]
    NonExistentVariable,
    /// Error when trying to update a constraint that doesn't exist
    #[error("Tried to access a constraint that doesn't exist")]
    NonExistentConstraint,
    /// Error when a bound update would loosen a previously added constraint
    #[error("Tried to loosen the lower bound of an existing constraint")]
    LoosenedConstraint,
    /// Error when tightening a constraint that has no lower bound to raise
    #[error("Tried to tighten a constraint that is not an inequality")]
    NotAnInequality,
    /// Error when the LP text export can't be written
    #[error("Failed to write LP file: {0}")]
    LpExport(#[source] std::io::Error),
}
