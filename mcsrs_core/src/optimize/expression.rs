//! Linear expressions and row-wise construction from coefficient matrices
//!
//! The dual transformation and the desired-behavior blocks both turn a
//! matrix and a parallel list of column variables into one constraint per
//! row. The builders here do exactly that translation: coefficients below
//! the configured tolerance are dropped, and a row with no surviving
//! entries is reported as `None` rather than an empty expression so that
//! callers can skip it entirely.
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use nalgebra::DMatrix;
use nalgebra_sparse::CooMatrix;

use crate::configuration::CONFIGURATION;

/// A sum of `coefficient * variable` terms, referencing variables by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<LinearTerm>,
}

impl LinearExpr {
    /// Create an empty expression
    pub fn new() -> Self {
        LinearExpr { terms: Vec::new() }
    }

    /// Append a term, silently dropping zero coefficients
    pub fn push(&mut self, variable: &str, coefficient: f64) {
        if coefficient == 0. {
            return;
        }
        self.terms.push(LinearTerm {
            variable: variable.to_string(),
            coefficient,
        });
    }

    /// Build an expression from parallel variable and coefficient slices
    pub fn from_slices(variables: &[&str], coefficients: &[f64]) -> Self {
        let mut expr = LinearExpr::new();
        for (var, coef) in variables.iter().zip(coefficients) {
            expr.push(var, *coef);
        }
        expr
    }

    /// Expression summing the given variables with unit coefficients
    pub fn sum_of(variables: &[String]) -> Self {
        let mut expr = LinearExpr::new();
        for var in variables {
            expr.push(var, 1.);
        }
        expr
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Iterate over `(variable id, coefficient)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|t| (t.variable.as_str(), t.coefficient))
    }
}

/// Represents a single term in an expression, specifically
/// the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTerm {
    /// Id of the referenced variable
    pub variable: String,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl Display for LinearTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.coefficient, self.variable)
    }
}

impl Display for LinearExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let rendered: Vec<String> = self.terms.iter().map(|t| format!("{}", t)).collect();
        write!(f, "{}", rendered.join(" + "))
    }
}

/// Build one expression per row of a dense matrix
///
/// `variables` supplies one variable id per column. Rows whose entries are
/// all below tolerance yield `None`.
///
/// # Panics
/// Panics if the number of variables differs from the number of columns.
pub fn dense_row_expressions(matrix: &DMatrix<f64>, variables: &[String]) -> Vec<Option<LinearExpr>> {
    assert_eq!(
        matrix.ncols(),
        variables.len(),
        "one variable per matrix column required"
    );
    let tolerance = CONFIGURATION.read().unwrap().tolerance;
    let mut rows = Vec::with_capacity(matrix.nrows());
    for i in 0..matrix.nrows() {
        let mut expr = LinearExpr::new();
        for j in 0..matrix.ncols() {
            let coef = matrix[(i, j)];
            if coef.abs() > tolerance {
                expr.push(&variables[j], coef);
            }
        }
        rows.push(if expr.is_empty() { None } else { Some(expr) });
    }
    rows
}

/// Build one expression per row of a sparse matrix in triplet form
///
/// The triplet stream may arrive in any order and may contain duplicate
/// entries (which a COO matrix defines as summed); both are canonicalized
/// here by accumulating per row before emitting terms.
///
/// # Panics
/// Panics if the number of variables differs from the number of columns.
pub fn sparse_row_expressions(
    matrix: &CooMatrix<f64>,
    variables: &[String],
) -> Vec<Option<LinearExpr>> {
    assert_eq!(
        matrix.ncols(),
        variables.len(),
        "one variable per matrix column required"
    );
    let tolerance = CONFIGURATION.read().unwrap().tolerance;
    let mut buckets: Vec<IndexMap<usize, f64>> = vec![IndexMap::new(); matrix.nrows()];
    for (i, j, value) in matrix.triplet_iter() {
        *buckets[i].entry(j).or_insert(0.) += value;
    }
    buckets
        .into_iter()
        .map(|row| {
            let mut expr = LinearExpr::new();
            for (j, coef) in row {
                if coef.abs() > tolerance {
                    expr.push(&variables[j], coef);
                }
            }
            if expr.is_empty() {
                None
            } else {
                Some(expr)
            }
        })
        .collect()
}
