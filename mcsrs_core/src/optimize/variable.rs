//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A decision variable of an optimization problem
///
/// Bounds are optional on both sides: `None` means the variable is
/// genuinely unbounded in that direction. A missing bound must never be
/// replaced by a large finite number, some backends misbehave badly when
/// fed a pseudo-infinity.
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Used to identify the variable
    #[builder(setter(into))]
    pub id: String,
    /// Human-readable variable name
    #[builder(default = "None", setter(into, strip_option))]
    pub name: Option<String>,
    /// The type of the variable (see [`VariableType`])
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
    /// Lower bound, `None` when unbounded below
    #[builder(default = "None")]
    pub lower_bound: Option<f64>,
    /// Upper bound, `None` when unbounded above
    #[builder(default = "None")]
    pub upper_bound: Option<f64>,
    /// Position of the variable in the problem's column order
    #[builder(default = "0")]
    pub index: usize,
}

impl Variable {
    /// Create a new continuous variable with the given bounds
    pub fn new_continuous(id: &str, lower_bound: Option<f64>, upper_bound: Option<f64>) -> Self {
        Variable {
            id: id.to_string(),
            name: None,
            variable_type: VariableType::Continuous,
            lower_bound,
            upper_bound,
            index: 0,
        }
    }

    /// Create a new binary variable (bounds 0/1)
    pub fn new_binary(id: &str) -> Self {
        Variable {
            id: id.to_string(),
            name: None,
            variable_type: VariableType::Binary,
            lower_bound: Some(0.),
            upper_bound: Some(1.),
            index: 0,
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", name, self.variable_type),
            None => write!(f, "{}:{}", self.id, self.variable_type),
        }
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported for all solvers, all backends
/// shipped with this crate support all three types
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let var = VariableBuilder::default().id("x").build().unwrap();
        assert_eq!(var.variable_type, VariableType::Continuous);
        assert_eq!(var.lower_bound, None);
        assert_eq!(var.upper_bound, None);
        assert_eq!(var.index, 0);
    }

    #[test]
    fn binary_bounds() {
        let var = Variable::new_binary("z");
        assert_eq!(var.lower_bound, Some(0.));
        assert_eq!(var.upper_bound, Some(1.));
        assert_eq!(format!("{}", var), "z:BINARY");
    }
}
