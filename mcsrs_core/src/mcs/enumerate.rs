//! Smallest-first enumeration of minimal cut sets
//!
//! The engine repeatedly solves the assembled MILP, reads the knockout
//! support out of each optimum, and appends an exclusion constraint so the
//! set (and every superset of it) can never be produced again. Because the
//! objective minimizes cardinality, sets come out in non-decreasing size
//! and each one is minimal by construction. A backend with solution pools
//! can instead harvest every optimum of a size level in one call.
use std::time::{Duration, Instant};

use derive_builder::Builder;
use log::{debug, warn};

use crate::mcs::milp::McsMilp;
use crate::mcs::{CutSet, McsError};
use crate::optimize::expression::LinearExpr;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// How solutions are pulled out of the solver
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum EnumerationMethod {
    /// One solve per cut set
    #[default]
    Iterate,
    /// One solution-pool harvest per size level
    Populate,
}

/// Stop conditions for one enumeration run
#[derive(Builder, Debug, Clone)]
pub struct EnumerationLimits {
    /// Largest cut-set cardinality to report
    #[builder(default = "usize::MAX")]
    pub max_size: usize,
    /// Stop after this many cut sets, `None` for no cap
    #[builder(default)]
    pub max_count: Option<usize>,
    /// How solutions are pulled out of the solver
    #[builder(default)]
    pub method: EnumerationMethod,
    /// Wall-clock budget for the whole run, `None` for no limit
    #[builder(default)]
    pub timeout: Option<Duration>,
}

impl Default for EnumerationLimits {
    fn default() -> Self {
        EnumerationLimitsBuilder::default().build().unwrap()
    }
}

/// Why an enumeration run stopped
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnumerationStatus {
    /// No further cut set exists
    Exhausted,
    /// The next cut set would exceed the size limit
    SizeLimitReached,
    /// The wall-clock budget ran out
    TimeLimitReached,
    /// The requested number of cut sets was found
    CountReached,
    /// The backend failed or returned an unusable status
    SolverFailure,
}

/// The outcome of one enumeration run
///
/// `cut_sets` holds everything found before the stop condition fired, so a
/// timed-out or failed run still reports its partial results.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub cut_sets: Vec<CutSet>,
    pub status: EnumerationStatus,
    /// Status of the last solver call, for diagnosing early stops
    pub solver_status: OptimizationStatus,
    pub elapsed: Duration,
}

/// The enumeration engine: an assembled model plus a solver backend
///
/// The model is mutated monotonically across iterations (exclusion rows
/// appended, the size row tightened), so one engine instance can resume
/// with further [`McsEnumerator::enumerate`] calls under new limits.
pub struct McsEnumerator {
    solver: Box<dyn Solver>,
    problem: Problem,
    z_ids: Vec<String>,
    ref_set: Option<Vec<CutSet>>,
    /// Proven lower bound on the next cut set's cardinality
    lower_bound: usize,
    exclusions: usize,
}

impl McsEnumerator {
    /// Create an engine, checking the backend against the model up front
    pub fn new(milp: McsMilp, solver: Box<dyn Solver>) -> Result<Self, McsError> {
        if milp.problem.has_indicator_constraints() && !solver.supports_indicator_constraints() {
            return Err(McsError::IndicatorUnsupported(solver.name()));
        }
        Ok(McsEnumerator {
            solver,
            problem: milp.problem,
            z_ids: milp.z_ids,
            ref_set: milp.ref_set,
            lower_bound: 0,
            exclusions: 0,
        })
    }

    /// The model in its current state, exclusion rows and raised size
    /// bound included, e.g. for LP-text export between enumeration calls
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Enumerate cut sets smallest first until a stop condition fires
    pub fn enumerate(&mut self, limits: &EnumerationLimits) -> Result<Enumeration, McsError> {
        if limits.method == EnumerationMethod::Populate && !self.solver.supports_populate() {
            return Err(McsError::PopulateUnsupported(self.solver.name()));
        }
        let start = Instant::now();
        let mut cut_sets: Vec<CutSet> = Vec::new();
        let mut solver_status = OptimizationStatus::Unoptimized;
        let status = loop {
            if limits.max_count.is_some_and(|cap| cut_sets.len() >= cap) {
                break EnumerationStatus::CountReached;
            }
            if self.lower_bound > limits.max_size {
                break EnumerationStatus::SizeLimitReached;
            }
            let budget = match limits.timeout {
                Some(total) => match total.checked_sub(start.elapsed()) {
                    Some(left) if !left.is_zero() => Some(left),
                    _ => break EnumerationStatus::TimeLimitReached,
                },
                None => None,
            };

            match limits.method {
                EnumerationMethod::Iterate => {
                    let solution = match self.solver.solve(&self.problem, budget) {
                        Ok(solution) => solution,
                        Err(err) => {
                            warn!("enumeration stopped on solver failure: {}", err);
                            break EnumerationStatus::SolverFailure;
                        }
                    };
                    solver_status = solution.status;
                    match solution.status {
                        OptimizationStatus::Optimal => {
                            let size = solution.objective_value.unwrap_or(0.).round() as usize;
                            if size > self.lower_bound {
                                self.raise_lower_bound(size)?;
                            }
                            if size > limits.max_size {
                                break EnumerationStatus::SizeLimitReached;
                            }
                            let cut_set = self.extract_cut_set(&solution);
                            self.cross_check(&cut_set, &solution);
                            let empty = cut_set.is_empty();
                            if !empty {
                                self.exclude(&cut_set)?;
                            }
                            cut_sets.push(cut_set);
                            if empty {
                                // everything else is a superset of the
                                // empty set
                                break EnumerationStatus::Exhausted;
                            }
                        }
                        OptimizationStatus::Infeasible => break EnumerationStatus::Exhausted,
                        OptimizationStatus::SolverHalted if limits.timeout.is_some() => {
                            break EnumerationStatus::TimeLimitReached
                        }
                        _ => break EnumerationStatus::SolverFailure,
                    }
                }
                EnumerationMethod::Populate => {
                    let pool = match self.solver.populate(&self.problem, &self.z_ids, budget) {
                        Ok(pool) => pool,
                        Err(err) => {
                            warn!("enumeration stopped on solver failure: {}", err);
                            break EnumerationStatus::SolverFailure;
                        }
                    };
                    if pool.is_empty() {
                        solver_status = OptimizationStatus::Infeasible;
                        break EnumerationStatus::Exhausted;
                    }
                    solver_status = OptimizationStatus::Optimal;
                    let mut level = self.lower_bound;
                    let mut found_empty = false;
                    let mut capped = false;
                    for solution in &pool {
                        if limits.max_count.is_some_and(|cap| cut_sets.len() >= cap) {
                            capped = true;
                            break;
                        }
                        level = solution.objective_value.unwrap_or(0.).round() as usize;
                        if level > limits.max_size {
                            break;
                        }
                        let cut_set = self.extract_cut_set(solution);
                        self.cross_check(&cut_set, solution);
                        found_empty = cut_set.is_empty();
                        if !found_empty {
                            self.exclude(&cut_set)?;
                        }
                        cut_sets.push(cut_set);
                        if found_empty {
                            break;
                        }
                    }
                    if found_empty {
                        break EnumerationStatus::Exhausted;
                    }
                    if capped {
                        break EnumerationStatus::CountReached;
                    }
                    if level > limits.max_size {
                        break EnumerationStatus::SizeLimitReached;
                    }
                    // the pool exhausted this size level
                    self.raise_lower_bound(level + 1)?;
                }
            }
        };
        Ok(Enumeration {
            cut_sets,
            status,
            solver_status,
            elapsed: start.elapsed(),
        })
    }

    /// Record that no cut set smaller than `size` remains
    fn raise_lower_bound(&mut self, size: usize) -> Result<(), McsError> {
        self.lower_bound = size;
        self.problem
            .tighten_inequality_lower_bound("min_size", size as f64)?;
        Ok(())
    }

    /// Read the knockout support out of an optimal solution
    fn extract_cut_set(&self, solution: &ProblemSolution) -> CutSet {
        let mut reactions = Vec::new();
        if let Some(values) = &solution.variable_values {
            for (j, id) in self.z_ids.iter().enumerate() {
                if values.get(id).copied().unwrap_or(0.) > 0.5 {
                    reactions.push(j);
                }
            }
        }
        CutSet::new(reactions)
    }

    /// Compare a found cut set against the reference list, if one was given
    fn cross_check(&self, cut_set: &CutSet, solution: &ProblemSolution) {
        let Some(reference) = &self.ref_set else { return };
        if reference.contains(cut_set) {
            return;
        }
        warn!("cut set {} is not in the reference set", cut_set);
        if let Some(values) = &solution.variable_values {
            for (id, value) in values {
                debug!("  {} = {}", id, value);
            }
        }
        debug!("model:\n{}", self.problem.to_lp_string());
    }

    /// Forbid a cut set and all of its supersets from appearing again
    fn exclude(&mut self, cut_set: &CutSet) -> Result<(), McsError> {
        let mut terms = LinearExpr::new();
        for j in cut_set.reactions() {
            terms.push(&self.z_ids[*j], 1.);
        }
        self.problem.add_new_inequality_constraint(
            &format!("excl{}", self.exclusions),
            terms,
            None,
            Some(cut_set.len() as f64 - 1.),
        )?;
        self.exclusions += 1;
        Ok(())
    }
}

#[cfg(all(test, feature = "microlp"))]
mod tests {
    use super::*;
    use crate::mcs::milp::{assemble, McsOptions, McsOptionsBuilder};
    use crate::network::{DesiredRegion, Network, ReactionBuilder, TargetRegion};
    use crate::optimize::solvers::microlp::MicrolpSolver;
    use nalgebra::{DMatrix, DVector};
    use nalgebra_sparse::CooMatrix;

    /// One metabolite, a cuttable producer and an uncuttable consumer; the
    /// target region demands at least one unit of production
    fn producer_network() -> (Network, TargetRegion) {
        let mut st = CooMatrix::new(1, 2);
        st.push(0, 0, 1.);
        st.push(0, 1, -1.);
        let reactions = vec![
            ReactionBuilder::default().id("producer").build().unwrap(),
            ReactionBuilder::default()
                .id("consumer")
                .cuttable(false)
                .build()
                .unwrap(),
        ];
        let network = Network::new(st, reactions).unwrap();
        let target = TargetRegion::new(
            DMatrix::from_row_slice(1, 2, &[-1., 0.]),
            DVector::from_vec(vec![-1.]),
        )
        .unwrap();
        (network, target)
    }

    /// Two parallel producers feeding one demand reaction; the target
    /// demands five units of output, which the small producer alone can't
    /// supply
    fn branched_network() -> (Network, TargetRegion) {
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
        let network = Network::new(st, reactions).unwrap();
        // -v2 <= -5 plus the reaction upper bounds as explicit rows
        let target = TargetRegion::new(
            DMatrix::from_row_slice(
                4,
                3,
                &[0., 0., -1., 1., 0., 0., 0., 1., 0., 0., 0., 1.],
            ),
            DVector::from_vec(vec![-5., 2., 10., 12.]),
        )
        .unwrap();
        (network, target)
    }

    fn big_m_options() -> McsOptions {
        McsOptionsBuilder::default()
            .big_m(1000.)
            .irrev_geq(true)
            .build()
            .unwrap()
    }

    fn engine(network: &Network, target: TargetRegion, options: &McsOptions) -> McsEnumerator {
        let milp = assemble(network, &[target], &[], options).unwrap();
        McsEnumerator::new(milp, Box::new(MicrolpSolver::new())).unwrap()
    }

    #[test]
    fn finds_the_only_cut_set() {
        let (network, target) = producer_network();
        let mut engine = engine(&network, target, &big_m_options());
        let result = engine.enumerate(&EnumerationLimits::default()).unwrap();
        assert_eq!(result.status, EnumerationStatus::Exhausted);
        assert_eq!(result.cut_sets, vec![CutSet::from([0])]);
        assert_eq!(result.solver_status, OptimizationStatus::Infeasible);
    }

    #[test]
    fn enumerates_all_minimal_sets() {
        let (network, target) = branched_network();
        let mut engine = engine(&network, target, &big_m_options());
        let result = engine.enumerate(&EnumerationLimits::default()).unwrap();
        assert_eq!(result.status, EnumerationStatus::Exhausted);

        // cutting the large producer or the demand reaction both work; the
        // small producer alone can't reach five units so {0} is not a cut
        let mut found = result.cut_sets.clone();
        found.sort();
        assert_eq!(found, vec![CutSet::from([1]), CutSet::from([2])]);

        // smallest first, no repeats, no supersets
        for window in result.cut_sets.windows(2) {
            assert!(window[0].len() <= window[1].len());
        }
        for (a, cs) in result.cut_sets.iter().enumerate() {
            for earlier in &result.cut_sets[..a] {
                assert!(!cs.is_superset_of(earlier));
            }
        }
    }

    #[test]
    fn enumerated_sets_pass_primal_verification() {
        use crate::mcs::verify::{check_mcs, constrain_region, flux_system};

        let (network, target) = branched_network();
        let matrix = target.matrix.clone();
        let rhs = target.rhs.clone();
        let mut engine = engine(&network, target, &big_m_options());
        let result = engine.enumerate(&EnumerationLimits::default()).unwrap();

        // knocking out each enumerated set must make the target region
        // infeasible in the primal flux system
        let (mut primal, flux_ids) = flux_system(&network).unwrap();
        constrain_region(&mut primal, &flux_ids, &matrix, &rhs).unwrap();
        let mut solver = MicrolpSolver::new();
        let checks = check_mcs(
            &mut solver,
            &primal,
            &flux_ids,
            &result.cut_sets,
            OptimizationStatus::Infeasible,
        )
        .unwrap();
        assert!(!checks.is_empty());
        assert!(checks.iter().all(|ok| *ok));
    }

    #[test]
    fn desired_region_filters_cut_sets() {
        let (network, target) = branched_network();
        // the demand reaction must stay able to carry one unit
        let desired = DesiredRegion::new(
            DMatrix::from_row_slice(1, 3, &[0., 0., -1.]),
            DVector::from_vec(vec![-1.]),
            vec![Some(0.), Some(0.), Some(0.)],
            vec![Some(2.), Some(10.), Some(12.)],
        )
        .unwrap();
        let milp = assemble(&network, &[target], &[desired], &big_m_options()).unwrap();
        let mut engine = McsEnumerator::new(milp, Box::new(MicrolpSolver::new())).unwrap();
        let result = engine.enumerate(&EnumerationLimits::default()).unwrap();
        assert_eq!(result.status, EnumerationStatus::Exhausted);
        assert_eq!(result.cut_sets, vec![CutSet::from([1])]);
    }

    #[test]
    fn size_limit_stops_before_reporting() {
        let (network, target) = producer_network();
        let mut engine = engine(&network, target, &big_m_options());
        let limits = EnumerationLimitsBuilder::default()
            .max_size(0_usize)
            .build()
            .unwrap();
        let result = engine.enumerate(&limits).unwrap();
        assert_eq!(result.status, EnumerationStatus::SizeLimitReached);
        assert!(result.cut_sets.is_empty());
    }

    #[test]
    fn count_limit_stops_early() {
        let (network, target) = branched_network();
        let mut engine = engine(&network, target, &big_m_options());
        let limits = EnumerationLimitsBuilder::default()
            .max_count(Some(1))
            .build()
            .unwrap();
        let result = engine.enumerate(&limits).unwrap();
        assert_eq!(result.status, EnumerationStatus::CountReached);
        assert_eq!(result.cut_sets.len(), 1);
    }

    #[test]
    fn zero_timeout_returns_cleanly() {
        let (network, target) = producer_network();
        let mut engine = engine(&network, target, &big_m_options());
        let limits = EnumerationLimitsBuilder::default()
            .timeout(Some(Duration::ZERO))
            .build()
            .unwrap();
        let result = engine.enumerate(&limits).unwrap();
        assert_eq!(result.status, EnumerationStatus::TimeLimitReached);
        assert!(result.cut_sets.is_empty());
        assert_eq!(result.solver_status, OptimizationStatus::Unoptimized);
    }

    #[test]
    fn indicator_model_is_rejected_by_microlp() {
        let (network, target) = producer_network();
        // big_m = 0 selects indicator constraints, which microlp lacks
        let milp = assemble(&network, &[target], &[], &McsOptions::default()).unwrap();
        let res = McsEnumerator::new(milp, Box::new(MicrolpSolver::new()));
        assert!(matches!(res, Err(McsError::IndicatorUnsupported("microlp"))));
    }

    /// A backend wrapper that fails with a transient error after a fixed
    /// number of successful solves
    struct FailingSolver {
        inner: MicrolpSolver,
        solves_left: usize,
    }

    impl Solver for FailingSolver {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn supports_indicator_constraints(&self) -> bool {
            false
        }
        fn supports_populate(&self) -> bool {
            false
        }
        fn solve(
            &mut self,
            problem: &crate::optimize::problem::Problem,
            time_limit: Option<Duration>,
        ) -> Result<crate::optimize::ProblemSolution, crate::optimize::solvers::SolverError> {
            if self.solves_left == 0 {
                return Err(crate::optimize::solvers::SolverError::Backend(
                    "connection lost".to_string(),
                ));
            }
            self.solves_left -= 1;
            self.inner.solve(problem, time_limit)
        }
    }

    #[test]
    fn transient_failure_keeps_partial_results() {
        let (network, target) = branched_network();
        let milp = assemble(&network, &[target], &[], &big_m_options()).unwrap();
        let solver = FailingSolver {
            inner: MicrolpSolver::new(),
            solves_left: 1,
        };
        let mut engine = McsEnumerator::new(milp, Box::new(solver)).unwrap();
        // the second solve errors out; the first cut set must survive
        let result = engine.enumerate(&EnumerationLimits::default()).unwrap();
        assert_eq!(result.status, EnumerationStatus::SolverFailure);
        assert_eq!(result.cut_sets.len(), 1);
        assert_eq!(result.cut_sets[0].len(), 1);
    }

    #[test]
    fn populate_without_pool_support_fails_before_solving() {
        let (network, target) = branched_network();
        let milp = assemble(&network, &[target], &[], &big_m_options()).unwrap();
        let solver = FailingSolver {
            inner: MicrolpSolver::new(),
            solves_left: 0,
        };
        let mut engine = McsEnumerator::new(milp, Box::new(solver)).unwrap();
        let limits = EnumerationLimitsBuilder::default()
            .method(EnumerationMethod::Populate)
            .build()
            .unwrap();
        let res = engine.enumerate(&limits);
        assert!(matches!(res, Err(McsError::PopulateUnsupported("failing"))));
    }

    #[test]
    fn mutated_model_stays_inspectable() {
        let (network, target) = producer_network();
        let mut engine = engine(&network, target, &big_m_options());
        assert!(engine.problem().constraint("excl0").is_none());
        engine.enumerate(&EnumerationLimits::default()).unwrap();
        // the exclusion row added for the found set shows up in the
        // accessor and in the LP export
        assert!(engine.problem().constraint("excl0").is_some());
        assert!(engine.problem().to_lp_string().contains("excl0"));
    }

    #[test]
    fn populate_harvests_a_size_level_at_once() {
        let (network, target) = branched_network();
        let mut engine = engine(&network, target, &big_m_options());
        let limits = EnumerationLimitsBuilder::default()
            .method(EnumerationMethod::Populate)
            .build()
            .unwrap();
        let result = engine.enumerate(&limits).unwrap();
        assert_eq!(result.status, EnumerationStatus::Exhausted);
        let mut found = result.cut_sets.clone();
        found.sort();
        assert_eq!(found, vec![CutSet::from([1]), CutSet::from([2])]);
    }

    #[test]
    fn reference_mismatch_only_warns() {
        let (network, target) = producer_network();
        let options = McsOptionsBuilder::default()
            .big_m(1000.)
            .ref_set(Some(vec![CutSet::from([1])]))
            .build()
            .unwrap();
        let mut engine = engine(&network, target, &options);
        let result = engine.enumerate(&EnumerationLimits::default()).unwrap();
        assert_eq!(result.cut_sets, vec![CutSet::from([0])]);
    }
}
