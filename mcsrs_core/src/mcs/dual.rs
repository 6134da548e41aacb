//! Dual (Farkas) transformation of one target flux region
//!
//! For a target `{v : ST v = 0, T v <= t}` knocked down by a reaction
//! subset S, infeasibility is certified by duals `w` (metabolites, free),
//! `z >= 0` (target rows) and a per-reaction certificate variable that may
//! only be nonzero for reactions in S:
//!
//! ```text
//!   dp_j (+ dn_j) + (ST^T w)_j + (T^T z)_j  = 0   for every reaction j
//!   t^T z <= -threshold
//! ```
//!
//! The per-reaction rows are produced by stacking
//! `[I | I[:,rev] | ST^T | T^T]` into one sparse matrix and handing it to
//! the row-expression builder, so the dual model is assembled the same way
//! as every other matrix block in the crate.
use nalgebra_sparse::CooMatrix;

use crate::mcs::McsError;
use crate::network::{Network, TargetRegion};
use crate::optimize::expression::{sparse_row_expressions, LinearExpr};
use crate::optimize::problem::Problem;
use crate::optimize::variable::VariableType;

/// Ids of the dual variable blocks created for one target
pub(crate) struct TargetDual {
    /// Per-reaction certificate duals (`dp{k}_{j}`), non-negative in split
    /// mode
    pub reaction_duals: Vec<String>,
    /// Negative-direction duals of split reversible reactions
    /// (`dn{k}_{j}`), `None` for irreversible reactions or in unsplit mode
    pub negative_duals: Vec<Option<String>>,
}

/// Append one target's dual variable blocks and constraints to the model
///
/// `k` is the target's position, used to namespace variable ids;
/// `cuttable` is the effective knockout mask (options may override the
/// network's own flags).
pub(crate) fn build_target_dual(
    problem: &mut Problem,
    k: usize,
    network: &Network,
    target: &TargetRegion,
    cuttable: &[bool],
    split_reversible: bool,
    irrev_geq: bool,
    threshold: f64,
) -> Result<TargetDual, McsError> {
    let num_reac = network.num_reactions();
    let num_meta = network.num_metabolites();
    if target.matrix.ncols() != num_reac {
        return Err(McsError::Dimension(format!(
            "target {} has {} columns for {} reactions",
            k,
            target.matrix.ncols(),
            num_reac
        )));
    }
    let reversible = network.reversibility();

    // reaction certificate duals
    let mut reaction_duals = Vec::with_capacity(num_reac);
    for j in 0..num_reac {
        let id = format!("dp{}_{}", k, j);
        let lower = if split_reversible || (!reversible[j] && irrev_geq) {
            Some(0.)
        } else {
            None
        };
        problem.add_new_variable(&id, VariableType::Continuous, lower, None)?;
        reaction_duals.push(id);
    }

    // negative-direction duals of split reversible reactions
    let mut negative_duals = vec![None; num_reac];
    if split_reversible {
        for j in 0..num_reac {
            if !reversible[j] {
                continue;
            }
            let id = format!("dn{}_{}", k, j);
            // an irrepressible reaction can never certify a cut, pin the
            // negative part outright
            let lower = if cuttable[j] { None } else { Some(0.) };
            let upper = Some(0.);
            problem.add_new_variable(&id, VariableType::Continuous, lower, upper)?;
            negative_duals[j] = Some(id);
        }
    }

    // metabolite duals, free
    let mut metabolite_duals = Vec::with_capacity(num_meta);
    for i in 0..num_meta {
        let id = format!("dm{}_{}", k, i);
        problem.add_new_variable(&id, VariableType::Continuous, None, None)?;
        metabolite_duals.push(id);
    }

    // target-row duals, non-negative
    let mut row_duals = Vec::with_capacity(target.num_rows());
    for r in 0..target.num_rows() {
        let id = format!("dt{}_{}", k, r);
        problem.add_new_variable(&id, VariableType::Continuous, Some(0.), None)?;
        row_duals.push(id);
    }

    // stack [I | I[:,rev] | ST^T | T^T] and read it back row by row
    let split_ids: Vec<&String> = negative_duals.iter().flatten().collect();
    let num_cols = num_reac + split_ids.len() + num_meta + target.num_rows();
    let mut stacked = CooMatrix::new(num_reac, num_cols);
    for j in 0..num_reac {
        stacked.push(j, j, 1.);
    }
    let mut offset = num_reac;
    for (p, j) in (0..num_reac).filter(|j| negative_duals[*j].is_some()).enumerate() {
        stacked.push(j, offset + p, 1.);
    }
    offset += split_ids.len();
    for (i, j, value) in network.stoichiometry().triplet_iter() {
        stacked.push(j, offset + i, *value);
    }
    offset += num_meta;
    for r in 0..target.num_rows() {
        for j in 0..num_reac {
            let value = target.matrix[(r, j)];
            if value != 0. {
                stacked.push(j, offset + r, value);
            }
        }
    }

    let columns: Vec<String> = reaction_duals
        .iter()
        .cloned()
        .chain(split_ids.iter().map(|id| (*id).clone()))
        .chain(metabolite_duals.iter().cloned())
        .chain(row_duals.iter().cloned())
        .collect();

    for (j, row) in sparse_row_expressions(&stacked, &columns).into_iter().enumerate() {
        let Some(terms) = row else { continue };
        let id = format!("dual{}_r{}", k, j);
        if irrev_geq && !reversible[j] {
            // the irreversibility slack lives in the row itself
            problem.add_new_inequality_constraint(&id, terms, Some(0.), None)?;
        } else {
            problem.add_new_inequality_constraint(&id, terms, Some(0.), Some(0.))?;
        }
    }

    // the Farkas certificate: the dual objective must clear the threshold
    let mut certificate = LinearExpr::new();
    for (r, id) in row_duals.iter().enumerate() {
        certificate.push(id, target.rhs[r]);
    }
    problem.add_new_inequality_constraint(
        &format!("farkas{}", k),
        certificate,
        None,
        Some(-threshold),
    )?;

    Ok(TargetDual {
        reaction_duals,
        negative_duals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, ReactionBuilder, TargetRegion};
    use crate::optimize::constraint::Constraint;
    use nalgebra::{DMatrix, DVector};

    fn toy_network(reversible_second: bool) -> Network {
        let mut st = CooMatrix::new(1, 2);
        st.push(0, 0, 1.);
        st.push(0, 1, -1.);
        let reactions = vec![
            ReactionBuilder::default().id("producer").build().unwrap(),
            ReactionBuilder::default()
                .id("consumer")
                .reversible(reversible_second)
                .build()
                .unwrap(),
        ];
        Network::new(st, reactions).unwrap()
    }

    fn toy_target() -> TargetRegion {
        TargetRegion::new(DMatrix::from_row_slice(1, 2, &[-1., 0.]), DVector::from_vec(vec![-1.]))
            .unwrap()
    }

    #[test]
    fn split_mode_block_structure() {
        let network = toy_network(true);
        let mut problem = Problem::new_minimization();
        let dual =
            build_target_dual(&mut problem, 0, &network, &toy_target(), &[true, true], true, false, 1.).unwrap();

        // dp x2, dn for the reversible reaction, dm x1, dt x1
        assert_eq!(problem.num_variables(), 5);
        assert_eq!(dual.reaction_duals, vec!["dp0_0", "dp0_1"]);
        assert_eq!(dual.negative_duals[0], None);
        assert_eq!(dual.negative_duals[1], Some("dn0_1".to_string()));
        assert_eq!(problem.variable("dp0_0").unwrap().lower_bound, Some(0.));
        assert_eq!(problem.variable("dn0_1").unwrap().upper_bound, Some(0.));
        assert_eq!(problem.variable("dm0_0").unwrap().lower_bound, None);

        // one dual row per reaction plus the certificate row
        assert_eq!(problem.num_constraints(), 3);
        match problem.constraint("dual0_r0").unwrap() {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert_eq!(*lower_bound, Some(0.));
                assert_eq!(*upper_bound, Some(0.));
            }
            other => panic!("unexpected constraint {:?}", other),
        }
        match problem.constraint("farkas0").unwrap() {
            Constraint::Inequality {
                terms, upper_bound, ..
            } => {
                assert_eq!(*upper_bound, Some(-1.));
                let rendered: Vec<(&str, f64)> = terms.iter().collect();
                assert_eq!(rendered, vec![("dt0_0", -1.)]);
            }
            other => panic!("unexpected constraint {:?}", other),
        }
    }

    #[test]
    fn irrev_geq_relaxes_irreversible_rows() {
        let network = toy_network(true);
        let mut problem = Problem::new_minimization();
        build_target_dual(&mut problem, 0, &network, &toy_target(), &[true, true], true, true, 1.).unwrap();

        // the irreversible producer row is one-sided, the reversible not
        match problem.constraint("dual0_r0").unwrap() {
            Constraint::Inequality { upper_bound, .. } => assert_eq!(*upper_bound, None),
            other => panic!("unexpected constraint {:?}", other),
        }
        match problem.constraint("dual0_r1").unwrap() {
            Constraint::Inequality { upper_bound, .. } => assert_eq!(*upper_bound, Some(0.)),
            other => panic!("unexpected constraint {:?}", other),
        }
    }

    #[test]
    fn unsplit_mode_signs() {
        let network = toy_network(true);
        let mut problem = Problem::new_minimization();
        let dual =
            build_target_dual(&mut problem, 0, &network, &toy_target(), &[true, true], false, true, 1.).unwrap();
        assert!(dual.negative_duals.iter().all(|d| d.is_none()));
        // irreversible reaction dual is one-signed, reversible one free
        assert_eq!(problem.variable("dp0_0").unwrap().lower_bound, Some(0.));
        assert_eq!(problem.variable("dp0_1").unwrap().lower_bound, None);
    }

    #[test]
    fn column_count_mismatch_is_an_error() {
        let network = toy_network(false);
        let bad = TargetRegion::new(DMatrix::from_row_slice(1, 3, &[-1., 0., 0.]), DVector::from_vec(vec![-1.]))
            .unwrap();
        let mut problem = Problem::new_minimization();
        let res = build_target_dual(&mut problem, 0, &network, &bad, &[true, true], true, false, 1.);
        assert!(matches!(res, Err(McsError::Dimension(_))));
    }
}
