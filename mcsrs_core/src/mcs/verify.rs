//! Verification utilities for enumerated cut sets
//!
//! Enumeration proves cut sets through the dual model; these helpers check
//! them the direct way, by knocking the reactions out of a primal flux
//! system and observing whether a region survives. They also expand cut
//! sets found on a lumped network back to the original reaction indices.
use indexmap::IndexSet;
use nalgebra::{DMatrix, DVector};

use crate::mcs::{CutSet, McsError};
use crate::network::Network;
use crate::optimize::expression::{dense_row_expressions, sparse_row_expressions};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

/// Build the primal flux feasibility system of a network
///
/// One flux variable per reaction bounded by the reaction's flux bounds,
/// one mass-balance equality per metabolite, and a constant objective.
/// Returns the model together with the flux variable ids in column order.
pub fn flux_system(network: &Network) -> Result<(Problem, Vec<String>), McsError> {
    let mut problem = Problem::new_minimization();
    let mut flux_ids = Vec::with_capacity(network.num_reactions());
    for (j, reaction) in network.reactions().iter().enumerate() {
        let id = format!("v{}", j);
        problem.add_new_variable(
            &id,
            VariableType::Continuous,
            reaction.flux_lower_bound(),
            reaction.flux_upper_bound(),
        )?;
        flux_ids.push(id);
    }
    for (i, row) in sparse_row_expressions(network.stoichiometry(), &flux_ids)
        .into_iter()
        .enumerate()
    {
        let Some(terms) = row else { continue };
        problem.add_new_equality_constraint(&format!("mass{}", i), terms, 0.)?;
    }
    Ok((problem, flux_ids))
}

/// Append the rows of a flux-space region, `matrix @ v <= rhs`, to a flux
/// system
pub fn constrain_region(
    problem: &mut Problem,
    flux_ids: &[String],
    matrix: &DMatrix<f64>,
    rhs: &DVector<f64>,
) -> Result<(), McsError> {
    if matrix.ncols() != flux_ids.len() {
        return Err(McsError::Dimension(format!(
            "region has {} columns for {} flux variables",
            matrix.ncols(),
            flux_ids.len()
        )));
    }
    if matrix.nrows() != rhs.len() {
        return Err(McsError::Dimension(format!(
            "region has {} rows but {} right-hand sides",
            matrix.nrows(),
            rhs.len()
        )));
    }
    let base = problem.num_constraints();
    for (r, row) in dense_row_expressions(matrix, flux_ids).into_iter().enumerate() {
        let Some(terms) = row else { continue };
        problem.add_new_inequality_constraint(
            &format!("region{}_{}", base, r),
            terms,
            None,
            Some(rhs[r]),
        )?;
    }
    Ok(())
}

/// Check candidate cut sets against a prepared flux system
///
/// Each candidate is applied by pinning its flux variables to zero in a
/// copy of the model; the candidate passes when the solve ends in the
/// `expected` status. A target system passes with
/// [`OptimizationStatus::Infeasible`], a desired system with
/// [`OptimizationStatus::Optimal`].
pub fn check_mcs(
    solver: &mut dyn Solver,
    problem: &Problem,
    flux_ids: &[String],
    cut_sets: &[CutSet],
    expected: OptimizationStatus,
) -> Result<Vec<bool>, McsError> {
    let mut results = Vec::with_capacity(cut_sets.len());
    for cut_set in cut_sets {
        let mut knocked = problem.clone();
        for j in cut_set.reactions() {
            let id = flux_ids.get(*j).ok_or_else(|| {
                McsError::Dimension(format!(
                    "cut set references reaction {} but only {} flux variables exist",
                    j,
                    flux_ids.len()
                ))
            })?;
            knocked.update_variable_bounds(id, Some(0.), Some(0.))?;
        }
        let solution = solver.solve(&knocked, None)?;
        results.push(solution.status == expected);
    }
    Ok(results)
}

/// Expand cut sets found on a lumped network to original reaction indices
///
/// `subreactions[j]` lists the original reactions lumped into reaction `j`.
/// Every combination that picks one original reaction per lumped one
/// becomes a cut set; duplicates arising from overlapping lumps are
/// removed, preserving discovery order.
pub fn expand_mcs(
    cut_sets: &[CutSet],
    subreactions: &[Vec<usize>],
) -> Result<Vec<CutSet>, McsError> {
    if let Some(empty) = subreactions.iter().position(|subs| subs.is_empty()) {
        return Err(McsError::Dimension(format!(
            "lumped reaction {} maps to no original reactions",
            empty
        )));
    }
    let mut expanded: IndexSet<CutSet> = IndexSet::new();
    for cut_set in cut_sets {
        let mut partial: Vec<Vec<usize>> = vec![Vec::new()];
        for j in cut_set.reactions() {
            let subs = subreactions.get(*j).ok_or_else(|| {
                McsError::Dimension(format!(
                    "cut set references lumped reaction {} but only {} mappings exist",
                    j,
                    subreactions.len()
                ))
            })?;
            let mut next = Vec::with_capacity(partial.len() * subs.len());
            for stem in &partial {
                for sub in subs {
                    let mut grown = stem.clone();
                    grown.push(*sub);
                    next.push(grown);
                }
            }
            partial = next;
        }
        for reactions in partial {
            expanded.insert(CutSet::new(reactions));
        }
    }
    Ok(expanded.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ReactionBuilder;
    use nalgebra_sparse::CooMatrix;

    fn branched_network() -> Network {
        let mut st = CooMatrix::new(1, 3);
        st.push(0, 0, 1.);
        st.push(0, 1, 1.);
        st.push(0, 2, -1.);
        let reactions = vec![
            ReactionBuilder::default()
                .id("small")
                .lower_bound(Some(0.))
                .upper_bound(Some(2.))
                .build()
                .unwrap(),
            ReactionBuilder::default()
                .id("large")
                .lower_bound(Some(0.))
                .upper_bound(Some(10.))
                .build()
                .unwrap(),
            ReactionBuilder::default()
                .id("demand")
                .lower_bound(Some(0.))
                .upper_bound(Some(12.))
                .build()
                .unwrap(),
        ];
        Network::new(st, reactions).unwrap()
    }

    #[test]
    fn flux_system_shape() {
        let (problem, flux_ids) = flux_system(&branched_network()).unwrap();
        assert_eq!(flux_ids, vec!["v0", "v1", "v2"]);
        assert_eq!(problem.num_constraints(), 1);
        // irreversible reactions are floored at zero
        assert_eq!(problem.variable("v0").unwrap().lower_bound, Some(0.));
        assert_eq!(problem.variable("v1").unwrap().upper_bound, Some(10.));
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn check_against_a_target_system() {
        use crate::optimize::solvers::microlp::MicrolpSolver;

        let network = branched_network();
        let (mut problem, flux_ids) = flux_system(&network).unwrap();
        // demand at least five units of output
        constrain_region(
            &mut problem,
            &flux_ids,
            &DMatrix::from_row_slice(1, 3, &[0., 0., -1.]),
            &DVector::from_vec(vec![-5.]),
        )
        .unwrap();

        let mut solver = MicrolpSolver::new();
        let candidates = [CutSet::from([1]), CutSet::from([2]), CutSet::from([0])];
        let results = check_mcs(
            &mut solver,
            &problem,
            &flux_ids,
            &candidates,
            OptimizationStatus::Infeasible,
        )
        .unwrap();
        // the small producer alone still leaves the target reachable
        assert_eq!(results, vec![true, true, false]);
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn check_against_a_desired_system() {
        use crate::optimize::solvers::microlp::MicrolpSolver;

        let network = branched_network();
        let (mut problem, flux_ids) = flux_system(&network).unwrap();
        // one unit of output must stay reachable
        constrain_region(
            &mut problem,
            &flux_ids,
            &DMatrix::from_row_slice(1, 3, &[0., 0., -1.]),
            &DVector::from_vec(vec![-1.]),
        )
        .unwrap();

        let mut solver = MicrolpSolver::new();
        let candidates = [CutSet::from([1]), CutSet::from([2])];
        let results = check_mcs(
            &mut solver,
            &problem,
            &flux_ids,
            &candidates,
            OptimizationStatus::Optimal,
        )
        .unwrap();
        // cutting the demand reaction kills the desired behavior
        assert_eq!(results, vec![true, false]);
    }

    #[test]
    fn out_of_range_cut_is_an_error() {
        let network = branched_network();
        let (problem, flux_ids) = flux_system(&network).unwrap();
        let mut solver = NoSolver;
        let res = check_mcs(
            &mut solver,
            &problem,
            &flux_ids,
            &[CutSet::from([7])],
            OptimizationStatus::Infeasible,
        );
        assert!(matches!(res, Err(McsError::Dimension(_))));
    }

    /// A stand-in backend for tests that must fail before solving
    struct NoSolver;

    impl Solver for NoSolver {
        fn name(&self) -> &'static str {
            "none"
        }
        fn supports_indicator_constraints(&self) -> bool {
            false
        }
        fn supports_populate(&self) -> bool {
            false
        }
        fn solve(
            &mut self,
            _problem: &Problem,
            _time_limit: Option<std::time::Duration>,
        ) -> Result<crate::optimize::ProblemSolution, crate::optimize::solvers::SolverError> {
            panic!("solve should not be reached")
        }
    }

    #[test]
    fn identity_expansion_is_idempotent() {
        let sets = vec![CutSet::from([0, 2]), CutSet::from([1])];
        let mapping = vec![vec![0], vec![1], vec![2]];
        let expanded = expand_mcs(&sets, &mapping).unwrap();
        assert_eq!(expanded, sets);
    }

    #[test]
    fn lumped_reactions_fan_out() {
        // lumped reaction 0 covers originals 0 and 1
        let sets = vec![CutSet::from([0, 1])];
        let mapping = vec![vec![0, 1], vec![2]];
        let expanded = expand_mcs(&sets, &mapping).unwrap();
        assert_eq!(
            expanded,
            vec![CutSet::from([0, 2]), CutSet::from([1, 2])]
        );
    }

    #[test]
    fn overlapping_expansions_are_deduplicated() {
        let sets = vec![CutSet::from([0]), CutSet::from([1])];
        // both lumps contain original reaction 3
        let mapping = vec![vec![3], vec![3, 4]];
        let expanded = expand_mcs(&sets, &mapping).unwrap();
        assert_eq!(expanded, vec![CutSet::from([3]), CutSet::from([4])]);
    }

    #[test]
    fn bad_mappings_are_errors() {
        let sets = vec![CutSet::from([0])];
        assert!(matches!(
            expand_mcs(&sets, &[vec![0], vec![]]),
            Err(McsError::Dimension(_))
        ));
        assert!(matches!(
            expand_mcs(&sets, &[]),
            Err(McsError::Dimension(_))
        ));
    }
}
