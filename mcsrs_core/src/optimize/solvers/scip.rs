//! Implements a solver interface for SCIP via russcip
//!
//! SCIP enforces indicator constraints natively, which makes it the
//! backend of choice when big-M linking is disabled. russcip's model is
//! consumed by each solve, so the translation is redone per call; the
//! persistent model of record stays on our side.
use std::time::Duration;

use indexmap::IndexMap;
use russcip::model::{Model, ObjSense, ProblemCreated};
use russcip::status::Status;
use russcip::variable::VarType;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

pub struct ScipSolver {}

impl ScipSolver {
    pub fn new() -> Self {
        ScipSolver {}
    }

    fn build_model(
        &self,
        problem: &Problem,
        time_limit: Option<Duration>,
    ) -> Result<
        (
            Model<ProblemCreated>,
            IndexMap<String, std::rc::Rc<russcip::variable::Variable>>,
        ),
        SolverError,
    > {
        let sense = match problem.objective().sense() {
            ObjectiveSense::Minimize => ObjSense::Minimize,
            ObjectiveSense::Maximize => ObjSense::Maximize,
        };
        let mut model = Model::new()
            .hide_output()
            .include_default_plugins()
            .create_prob("mcs")
            .set_obj_sense(sense);
        if let Some(limit) = time_limit {
            model = model
                .set_real_param("limits/time", limit.as_secs_f64())
                .map_err(|retcode| SolverError::Backend(format!("{:?}", retcode)))?;
        }

        let mut objective: IndexMap<&str, f64> = IndexMap::new();
        for (id, coef) in problem.objective().terms().iter() {
            *objective.entry(id).or_insert(0.) += coef;
        }

        let mut handles = IndexMap::new();
        for variable in problem.variables().values() {
            let var_type = match variable.variable_type {
                VariableType::Continuous => VarType::Continuous,
                VariableType::Integer => VarType::Integer,
                VariableType::Binary => VarType::Binary,
            };
            let handle = model.add_var(
                variable.lower_bound.unwrap_or(f64::NEG_INFINITY),
                variable.upper_bound.unwrap_or(f64::INFINITY),
                objective.get(variable.id.as_str()).copied().unwrap_or(0.),
                &variable.id,
                var_type,
            );
            handles.insert(variable.id.clone(), handle);
        }

        let mut negated = 0usize;
        for (id, constraint) in problem.constraints() {
            match constraint {
                Constraint::Equality { terms, equals } => {
                    let (vars, coefs) = split_terms(terms, &handles);
                    model.add_cons(vars, &coefs, *equals, *equals, id);
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                } => {
                    let (vars, coefs) = split_terms(terms, &handles);
                    model.add_cons(
                        vars,
                        &coefs,
                        lower_bound.unwrap_or(f64::NEG_INFINITY),
                        upper_bound.unwrap_or(f64::INFINITY),
                        id,
                    );
                }
                Constraint::Indicator {
                    indicator,
                    active_value,
                    terms,
                    upper_bound,
                } => {
                    let bin = if *active_value {
                        handles[indicator.as_str()].clone()
                    } else {
                        // SCIP indicators fire on 1; complement the binary
                        let aux =
                            model.add_var(0., 1., 0., &format!("neg{}_{}", negated, indicator), VarType::Binary);
                        negated += 1;
                        model.add_cons(
                            vec![handles[indicator.as_str()].clone(), aux.clone()],
                            &[1., 1.],
                            1.,
                            1.,
                            &format!("negdef{}_{}", negated, indicator),
                        );
                        aux
                    };
                    let (vars, mut coefs) = split_terms(terms, &handles);
                    model.add_cons_indicator(bin, vars, &mut coefs, *upper_bound, id);
                }
            }
        }
        Ok((model, handles))
    }
}

impl Default for ScipSolver {
    fn default() -> Self {
        Self::new()
    }
}

fn split_terms(
    terms: &crate::optimize::expression::LinearExpr,
    handles: &IndexMap<String, std::rc::Rc<russcip::variable::Variable>>,
) -> (Vec<std::rc::Rc<russcip::variable::Variable>>, Vec<f64>) {
    let mut vars = Vec::with_capacity(terms.len());
    let mut coefs = Vec::with_capacity(terms.len());
    for (id, coef) in terms.iter() {
        vars.push(handles[id].clone());
        coefs.push(coef);
    }
    (vars, coefs)
}

impl Solver for ScipSolver {
    fn name(&self) -> &'static str {
        "scip"
    }

    fn supports_indicator_constraints(&self) -> bool {
        true
    }

    fn supports_populate(&self) -> bool {
        false
    }

    fn solve(
        &mut self,
        problem: &Problem,
        time_limit: Option<Duration>,
    ) -> Result<ProblemSolution, SolverError> {
        let (model, handles) = self.build_model(problem, time_limit)?;
        let solved = model.solve();
        let status = match solved.status() {
            Status::Optimal => OptimizationStatus::Optimal,
            Status::Infeasible => OptimizationStatus::Infeasible,
            Status::Unbounded => OptimizationStatus::Unbounded,
            Status::TimeLimit | Status::NodeLimit | Status::TotalNodeLimit => {
                OptimizationStatus::SolverHalted
            }
            _ => OptimizationStatus::NumericalError,
        };
        if status != OptimizationStatus::Optimal {
            return Ok(ProblemSolution::from_status(status));
        }
        let solution = solved
            .best_sol()
            .ok_or_else(|| SolverError::Backend("optimal status without a solution".into()))?;
        let values: IndexMap<String, f64> = handles
            .iter()
            .map(|(id, handle)| (id.clone(), solution.val(handle.clone())))
            .collect();
        Ok(ProblemSolution {
            status,
            objective_value: Some(solved.obj_val()),
            variable_values: Some(values),
        })
    }
}
