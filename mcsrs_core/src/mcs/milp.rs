//! Assembly of the cut-set enumeration MILP
//!
//! One model covers everything: per-target dual blocks whose certificate
//! variables are gated by the knockout binaries, optional desired-behavior
//! flux blocks coupled to the same binaries, a monotonically tightened
//! minimum-size row, and a minimize-cardinality objective. The gating
//! itself comes in two encodings selected by [`McsOptions::big_m`]: big-M
//! rows when a positive constant is given, indicator constraints when it
//! is zero.
use derive_builder::Builder;

use crate::mcs::dual::build_target_dual;
use crate::mcs::{CutSet, McsError};
use crate::network::{DesiredRegion, Network, TargetRegion};
use crate::optimize::constraint::Constraint;
use crate::optimize::expression::{dense_row_expressions, sparse_row_expressions, LinearExpr};
use crate::optimize::problem::Problem;
use crate::optimize::variable::VariableType;

/// Coefficient tying per-target local binaries to the global knockout
/// binary. Slightly below one so the link row never sits exactly on the
/// integer feasibility boundary.
const LOCAL_LINK_COEFF: f64 = 0.999;

/// Options controlling how the enumeration MILP is assembled
#[derive(Builder, Debug, Clone)]
pub struct McsOptions {
    /// Big-M constant for gating the dual certificates; `0.0` selects
    /// indicator constraints instead
    #[builder(default = "0.0")]
    pub big_m: f64,
    /// Margin by which the Farkas certificate must clear zero
    #[builder(default = "1.0")]
    pub threshold: f64,
    /// Give every reversible reaction a separate negative-direction dual
    #[builder(default = "true")]
    pub split_reversible: bool,
    /// Relax the dual rows of irreversible reactions to one-sided
    #[builder(default = "false")]
    pub irrev_geq: bool,
    /// Override of the network's per-reaction cuttability flags
    #[builder(default)]
    pub cuts: Option<Vec<bool>>,
    /// Reactions that may be added rather than removed; accepted for
    /// interface compatibility, rejected at assembly
    #[builder(default)]
    pub knock_ins: Vec<usize>,
    /// Known cut sets to cross-check each enumerated solution against
    #[builder(default)]
    pub ref_set: Option<Vec<CutSet>>,
}

impl Default for McsOptions {
    fn default() -> Self {
        McsOptionsBuilder::default().build().unwrap()
    }
}

/// The assembled enumeration model with the ids the engine needs back
#[derive(Debug, Clone)]
pub struct McsMilp {
    /// The mixed-integer model
    pub problem: Problem,
    /// Global knockout binaries, one per reaction, in column order
    pub z_ids: Vec<String>,
    /// Flux variable ids of each desired-behavior block
    pub desired_flux_ids: Vec<Vec<String>>,
    /// Effective knockout mask the model was built with
    pub cuttable: Vec<bool>,
    /// Reference cut sets carried through for enumeration cross-checks
    pub ref_set: Option<Vec<CutSet>>,
}

/// Build the enumeration MILP for a network, its target regions, and any
/// desired regions
///
/// Every feasible assignment of the returned model's knockout binaries is
/// a (not necessarily minimal) cut set; minimality comes from the engine
/// enumerating smallest first under exclusion constraints.
pub fn assemble(
    network: &Network,
    targets: &[TargetRegion],
    desired: &[DesiredRegion],
    options: &McsOptions,
) -> Result<McsMilp, McsError> {
    if !options.knock_ins.is_empty() {
        return Err(McsError::KnockInUnimplemented);
    }
    if targets.is_empty() {
        return Err(McsError::Dimension(
            "at least one target region is required".to_string(),
        ));
    }
    let num_reac = network.num_reactions();
    let cuttable = match &options.cuts {
        Some(mask) => {
            if mask.len() != num_reac {
                return Err(McsError::Dimension(format!(
                    "cut mask has {} entries for {} reactions",
                    mask.len(),
                    num_reac
                )));
            }
            mask.clone()
        }
        None => network.cuttable(),
    };

    let mut problem = Problem::new_minimization();

    // global knockout binaries; a reaction outside the mask keeps its
    // binary pinned at zero so the gating below shuts its duals off
    let mut z_ids = Vec::with_capacity(num_reac);
    for j in 0..num_reac {
        let id = format!("z{}", j);
        let upper = if cuttable[j] { Some(1.) } else { Some(0.) };
        problem.add_new_variable(&id, VariableType::Binary, Some(0.), upper)?;
        problem.add_new_linear_objective_term(&id, 1.)?;
        z_ids.push(id);
    }

    // per-target dual blocks, gated by the global binary directly for a
    // single target or by per-target locals linked to it otherwise
    let multi = targets.len() > 1;
    let mut local_ids: Vec<Vec<String>> = vec![Vec::new(); num_reac];
    for (k, target) in targets.iter().enumerate() {
        let dual = build_target_dual(
            &mut problem,
            k,
            network,
            target,
            &cuttable,
            options.split_reversible,
            options.irrev_geq,
            options.threshold,
        )?;
        for j in 0..num_reac {
            let gate = if multi {
                let id = format!("zl{}_{}", k, j);
                let upper = if cuttable[j] { Some(1.) } else { Some(0.) };
                problem.add_new_variable(&id, VariableType::Binary, Some(0.), upper)?;
                local_ids[j].push(id.clone());
                id
            } else {
                z_ids[j].clone()
            };
            link_dual(
                &mut problem,
                k,
                j,
                &dual.reaction_duals[j],
                dual.negative_duals[j].as_deref(),
                &gate,
                options.big_m,
            )?;
        }
    }
    if multi {
        // a reaction is cut globally as soon as any target needs it cut
        for j in 0..num_reac {
            let mut terms = LinearExpr::new();
            for id in &local_ids[j] {
                terms.push(id, LOCAL_LINK_COEFF);
            }
            terms.push(&z_ids[j], -(targets.len() as f64));
            problem.add_new_inequality_constraint(
                &format!("zlink{}", j),
                terms,
                None,
                Some(0.),
            )?;
        }
    }

    // desired-behavior blocks: a feasible flux vector must survive in each
    let mut desired_flux_ids = Vec::with_capacity(desired.len());
    for (l, region) in desired.iter().enumerate() {
        if region.matrix.ncols() != num_reac {
            return Err(McsError::Dimension(format!(
                "desired region {} has {} columns for {} reactions",
                l,
                region.matrix.ncols(),
                num_reac
            )));
        }
        let mut flux_ids = Vec::with_capacity(num_reac);
        for j in 0..num_reac {
            let id = format!("f{}_{}", l, j);
            problem.add_new_variable(
                &id,
                VariableType::Continuous,
                region.lower_bounds[j],
                region.upper_bounds[j],
            )?;
            flux_ids.push(id);
        }
        for (i, row) in sparse_row_expressions(network.stoichiometry(), &flux_ids)
            .into_iter()
            .enumerate()
        {
            let Some(terms) = row else { continue };
            problem.add_new_equality_constraint(&format!("des{}_m{}", l, i), terms, 0.)?;
        }
        for (r, row) in dense_row_expressions(&region.matrix, &flux_ids)
            .into_iter()
            .enumerate()
        {
            let Some(terms) = row else { continue };
            problem.add_new_inequality_constraint(
                &format!("des{}_d{}", l, r),
                terms,
                None,
                Some(region.rhs[r]),
            )?;
        }
        for j in 0..num_reac {
            if !cuttable[j] {
                continue;
            }
            couple_desired_flux(
                &mut problem,
                l,
                j,
                &flux_ids[j],
                &z_ids[j],
                region.lower_bounds[j],
                region.upper_bounds[j],
                options.big_m,
            )?;
        }
        desired_flux_ids.push(flux_ids);
    }

    // the engine raises this bound as sizes are exhausted
    problem.add_new_inequality_constraint("min_size", LinearExpr::sum_of(&z_ids), Some(0.), None)?;

    Ok(McsMilp {
        problem,
        z_ids,
        desired_flux_ids,
        cuttable,
        ref_set: options.ref_set.clone(),
    })
}

/// Gate one reaction's dual certificate variables behind its knockout
/// binary
///
/// With the gate at zero the duals are forced to zero; with it at one the
/// big-M constant (or the lifted indicator) frees them.
fn link_dual(
    problem: &mut Problem,
    k: usize,
    j: usize,
    positive: &str,
    negative: Option<&str>,
    gate: &str,
    big_m: f64,
) -> Result<(), McsError> {
    let free_below = problem
        .variable(positive)
        .map(|v| v.lower_bound.is_none())
        .unwrap_or(false);
    if big_m > 0. {
        problem.add_new_inequality_constraint(
            &format!("bigm_dp{}_{}", k, j),
            LinearExpr::from_slices(&[positive, gate], &[1., -big_m]),
            None,
            Some(0.),
        )?;
        if free_below {
            problem.add_new_inequality_constraint(
                &format!("bigm_dp_lo{}_{}", k, j),
                LinearExpr::from_slices(&[positive, gate], &[1., big_m]),
                Some(0.),
                None,
            )?;
        }
        if let Some(negative) = negative {
            problem.add_new_inequality_constraint(
                &format!("bigm_dn{}_{}", k, j),
                LinearExpr::from_slices(&[negative, gate], &[1., big_m]),
                Some(0.),
                None,
            )?;
        }
    } else {
        problem.add_constraint(
            &format!("ind_dp{}_{}", k, j),
            Constraint::new_indicator(
                gate,
                false,
                LinearExpr::from_slices(&[positive], &[1.]),
                0.,
            ),
        )?;
        if free_below {
            problem.add_constraint(
                &format!("ind_dp_lo{}_{}", k, j),
                Constraint::new_indicator(
                    gate,
                    false,
                    LinearExpr::from_slices(&[positive], &[-1.]),
                    0.,
                ),
            )?;
        }
        if let Some(negative) = negative {
            problem.add_constraint(
                &format!("ind_dn{}_{}", k, j),
                Constraint::new_indicator(
                    gate,
                    false,
                    LinearExpr::from_slices(&[negative], &[-1.]),
                    0.,
                ),
            )?;
        }
    }
    Ok(())
}

/// Force a desired-block flux variable to zero whenever its reaction is
/// knocked out
#[allow(clippy::too_many_arguments)]
fn couple_desired_flux(
    problem: &mut Problem,
    l: usize,
    j: usize,
    flux: &str,
    z: &str,
    lower: Option<f64>,
    upper: Option<f64>,
    big_m: f64,
) -> Result<(), McsError> {
    if big_m > 0. {
        // f + c z <= c reduces to f <= 0 at z = 1 and f <= c at z = 0
        let c = upper.unwrap_or(big_m);
        if c != 0. {
            problem.add_new_inequality_constraint(
                &format!("des{}_cut_ub{}", l, j),
                LinearExpr::from_slices(&[flux, z], &[1., c]),
                None,
                Some(c),
            )?;
        }
        let c = lower.unwrap_or(-big_m);
        if c != 0. {
            problem.add_new_inequality_constraint(
                &format!("des{}_cut_lb{}", l, j),
                LinearExpr::from_slices(&[flux, z], &[1., c]),
                Some(c),
                None,
            )?;
        }
    } else {
        problem.add_constraint(
            &format!("des{}_cut_ub{}", l, j),
            Constraint::new_indicator(
                z,
                true,
                LinearExpr::from_slices(&[flux], &[1.]),
                0.,
            ),
        )?;
        problem.add_constraint(
            &format!("des{}_cut_lb{}", l, j),
            Constraint::new_indicator(
                z,
                true,
                LinearExpr::from_slices(&[flux], &[-1.]),
                0.,
            ),
        )?;
    }
    Ok(())
}
