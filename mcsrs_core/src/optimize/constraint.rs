//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

use crate::optimize::expression::LinearExpr;

/// Represents a linear constraint in an optimization problem
///
/// A one-sided inequality carries `None` on its open side. The open side
/// is an explicit absence of a bound, not a large number.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Linear terms which are added together, see [`LinearExpr`] for more
        terms: LinearExpr,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint
    Inequality {
        /// Linear terms which are added together, see [`LinearExpr`] for more
        terms: LinearExpr,
        /// The lowest value the sum of the terms can take, `None` when unbounded
        lower_bound: Option<f64>,
        /// The highest value the sum of the terms can take, `None` when unbounded
        upper_bound: Option<f64>,
    },
    /// An indicator constraint: when the binary `indicator` variable takes
    /// `active_value`, `terms <= upper_bound` must hold
    Indicator {
        /// Id of the controlling binary variable
        indicator: String,
        /// The indicator value (0 or 1) that activates the implied inequality
        active_value: bool,
        /// Linear terms of the implied inequality
        terms: LinearExpr,
        /// Right hand side of the implied inequality
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint `terms = equals`
    pub fn new_equality(terms: LinearExpr, equals: f64) -> Self {
        Constraint::Equality { terms, equals }
    }

    /// Create a new one-sided inequality `terms <= upper_bound`
    pub fn new_less_equal(terms: LinearExpr, upper_bound: f64) -> Self {
        Constraint::Inequality {
            terms,
            lower_bound: None,
            upper_bound: Some(upper_bound),
        }
    }

    /// Create a new one-sided inequality `terms >= lower_bound`
    pub fn new_greater_equal(terms: LinearExpr, lower_bound: f64) -> Self {
        Constraint::Inequality {
            terms,
            lower_bound: Some(lower_bound),
            upper_bound: None,
        }
    }

    /// Create a new two-sided inequality `lower_bound <= terms <= upper_bound`
    pub fn new_range(terms: LinearExpr, lower_bound: f64, upper_bound: f64) -> Self {
        Constraint::Inequality {
            terms,
            lower_bound: Some(lower_bound),
            upper_bound: Some(upper_bound),
        }
    }

    /// Create a new indicator constraint
    /// `indicator == active_value  =>  terms <= upper_bound`
    pub fn new_indicator(
        indicator: &str,
        active_value: bool,
        terms: LinearExpr,
        upper_bound: f64,
    ) -> Self {
        Constraint::Indicator {
            indicator: indicator.to_string(),
            active_value,
            terms,
            upper_bound,
        }
    }

    /// The linear terms of the constraint (the implied inequality for
    /// indicator constraints)
    pub fn terms(&self) -> &LinearExpr {
        match self {
            Constraint::Equality { terms, .. } => terms,
            Constraint::Inequality { terms, .. } => terms,
            Constraint::Indicator { terms, .. } => terms,
        }
    }

    /// Iterate over the ids of all variables referenced by this constraint,
    /// including the controlling binary of an indicator constraint
    pub fn variable_ids(&self) -> impl Iterator<Item = &str> {
        let indicator = match self {
            Constraint::Indicator { indicator, .. } => Some(indicator.as_str()),
            _ => None,
        };
        self.terms().iter().map(|(id, _)| id).chain(indicator)
    }

    /// Whether this is an indicator constraint
    pub fn is_indicator(&self) -> bool {
        matches!(self, Constraint::Indicator { .. })
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { terms, equals } => write!(f, "{} = {}", terms, equals),
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            } => match (lower_bound, upper_bound) {
                (Some(lb), Some(ub)) => write!(f, "{} <= {} <= {}", lb, terms, ub),
                (Some(lb), None) => write!(f, "{} >= {}", terms, lb),
                (None, Some(ub)) => write!(f, "{} <= {}", terms, ub),
                (None, None) => write!(f, "{} free", terms),
            },
            Constraint::Indicator {
                indicator,
                active_value,
                terms,
                upper_bound,
            } => write!(
                f,
                "{} = {} -> {} <= {}",
                indicator,
                if *active_value { 1 } else { 0 },
                terms,
                upper_bound
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let cons = Constraint::new_equality(LinearExpr::from_slices(&["x", "y"], &[3., 2.]), 6.);
        assert_eq!(format!("{}", cons), "3*x + 2*y = 6");

        let cons = Constraint::new_range(LinearExpr::from_slices(&["x"], &[1.]), 2., 6.);
        assert_eq!(format!("{}", cons), "2 <= 1*x <= 6");

        let cons = Constraint::new_greater_equal(LinearExpr::from_slices(&["x"], &[1.]), 0.);
        assert_eq!(format!("{}", cons), "1*x >= 0");

        let cons =
            Constraint::new_indicator("z", false, LinearExpr::from_slices(&["d"], &[1.]), 0.);
        assert_eq!(format!("{}", cons), "z = 0 -> 1*d <= 0");
    }

    #[test]
    fn variable_ids_include_indicator() {
        let cons =
            Constraint::new_indicator("z", true, LinearExpr::from_slices(&["a", "b"], &[1., 1.]), 0.);
        let ids: Vec<&str> = cons.variable_ids().collect();
        assert_eq!(ids, vec!["a", "b", "z"]);
    }
}
