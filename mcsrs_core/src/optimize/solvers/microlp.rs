//! Implements a solver interface for microlp
//!
//! microlp is a pure-Rust simplex/branch-and-bound solver, so this backend
//! works without any system libraries. It has no native indicator
//! constraint or time-limit support; the solution pool is provided on top
//! of plain re-solving with no-good cuts.
use std::time::Duration;

use indexmap::IndexMap;
use log::debug;
use microlp::{ComparisonOp, OptimizationDirection};

use crate::configuration::CONFIGURATION;
use crate::optimize::constraint::Constraint;
use crate::optimize::expression::LinearExpr;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

pub struct MicrolpSolver {
    /// Whether the ignored per-solve budget has been reported yet
    warned_time_limit: bool,
}

impl MicrolpSolver {
    pub fn new() -> Self {
        MicrolpSolver {
            warned_time_limit: false,
        }
    }

    /// Translate the model into a fresh microlp problem
    fn translate(
        &self,
        problem: &Problem,
    ) -> Result<(microlp::Problem, Vec<(String, microlp::Variable)>), SolverError> {
        let direction = match problem.objective().sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut objective: IndexMap<&str, f64> = IndexMap::new();
        for (id, coef) in problem.objective().terms().iter() {
            *objective.entry(id).or_insert(0.) += coef;
        }

        let mut lp = microlp::Problem::new(direction);
        let mut handles: IndexMap<&str, microlp::Variable> = IndexMap::new();
        for variable in problem.variables().values() {
            let obj_coef = objective.get(variable.id.as_str()).copied().unwrap_or(0.);
            let handle = match variable.variable_type {
                crate::optimize::variable::VariableType::Continuous => lp.add_var(
                    obj_coef,
                    (
                        variable.lower_bound.unwrap_or(f64::NEG_INFINITY),
                        variable.upper_bound.unwrap_or(f64::INFINITY),
                    ),
                ),
                crate::optimize::variable::VariableType::Integer
                | crate::optimize::variable::VariableType::Binary => lp.add_integer_var(
                    obj_coef,
                    (
                        variable
                            .lower_bound
                            .map(|b| b.round() as i32)
                            .unwrap_or(i32::MIN),
                        variable
                            .upper_bound
                            .map(|b| b.round() as i32)
                            .unwrap_or(i32::MAX),
                    ),
                ),
            };
            handles.insert(variable.id.as_str(), handle);
        }

        let expr_terms = |terms: &LinearExpr| -> Vec<(microlp::Variable, f64)> {
            terms.iter().map(|(id, coef)| (handles[id], coef)).collect()
        };
        for constraint in problem.constraints().values() {
            match constraint {
                Constraint::Equality { terms, equals } => {
                    lp.add_constraint(expr_terms(terms), ComparisonOp::Eq, *equals);
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                } => {
                    if let Some(ub) = upper_bound {
                        lp.add_constraint(expr_terms(terms), ComparisonOp::Le, *ub);
                    }
                    if let Some(lb) = lower_bound {
                        lp.add_constraint(expr_terms(terms), ComparisonOp::Ge, *lb);
                    }
                }
                Constraint::Indicator { .. } => {
                    return Err(SolverError::IndicatorUnsupported(self.name()));
                }
            }
        }

        let handles = handles
            .into_iter()
            .map(|(id, handle)| (id.to_string(), handle))
            .collect();
        Ok((lp, handles))
    }
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn supports_indicator_constraints(&self) -> bool {
        false
    }

    fn supports_populate(&self) -> bool {
        true
    }

    fn solve(
        &mut self,
        problem: &Problem,
        time_limit: Option<Duration>,
    ) -> Result<ProblemSolution, SolverError> {
        if time_limit.is_some() && !self.warned_time_limit {
            debug!("microlp has no per-solve time limit; relying on the outer wall clock only");
            self.warned_time_limit = true;
        }
        let (lp, handles) = self.translate(problem)?;
        match lp.solve() {
            Ok(solution) => {
                let values: IndexMap<String, f64> = handles
                    .into_iter()
                    .map(|(id, handle)| (id, *solution.var_value(handle)))
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(solution.objective()),
                    variable_values: Some(values),
                })
            }
            Err(microlp::Error::Infeasible) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Unbounded))
            }
            Err(microlp::Error::InternalError(message)) => Err(SolverError::Backend(message)),
        }
    }

    fn populate(
        &mut self,
        problem: &Problem,
        pool_over: &[String],
        time_limit: Option<Duration>,
    ) -> Result<Vec<ProblemSolution>, SolverError> {
        let tolerance = CONFIGURATION.read().unwrap().tolerance;
        let mut working = problem.clone();
        let mut pool: Vec<ProblemSolution> = Vec::new();
        let mut optimum: Option<f64> = None;
        for round in 0.. {
            let solution = self.solve(&working, time_limit)?;
            if solution.status != OptimizationStatus::Optimal {
                break;
            }
            let objective = solution.objective_value.unwrap_or(0.);
            match optimum {
                None => optimum = Some(objective),
                // the pool only holds optimal-objective solutions
                Some(first) if objective > first + 0.5 => break,
                Some(_) => {}
            }
            let support: Vec<String> = {
                let values = solution
                    .variable_values
                    .as_ref()
                    .ok_or_else(|| SolverError::Backend("optimal solve without values".into()))?;
                pool_over
                    .iter()
                    .filter(|id| values.get(*id).copied().unwrap_or(0.) > 1. - tolerance.sqrt())
                    .cloned()
                    .collect()
            };
            pool.push(solution);
            if support.is_empty() {
                // only one solution with an empty pool support exists
                break;
            }
            let cut_rhs = support.len() as f64 - 1.;
            working
                .add_constraint(
                    &format!("pool_excl{}", round),
                    Constraint::new_less_equal(LinearExpr::sum_of(&support), cut_rhs),
                )
                .map_err(|err| SolverError::Backend(err.to_string()))?;
        }
        Ok(pool)
    }
}
