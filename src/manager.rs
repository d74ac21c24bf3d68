//! Component E — `ComputationManager`: policy and resource control.
//!
//! Owns every live Computation it hands back to the solver driver, and
//! enforces the §4.4 configuration knobs: when to split (`optimize`), when
//! to check for an early UNSAT, whether to sort operands before `conjunct`,
//! and which [`DependencyScheme`] governs `remove`/`removeApply`.

use rustc_hash::FxHashSet;

use crate::bdd::{Bdd, BddManager};
use crate::dependency::{Dynamic, Naive, Scheme, Standard, SubtreeContext};
use crate::error::{Abort, DriverResult, Outcome};
use crate::hypergraph::Hypergraph;
use crate::level::{QuantifierSequence, VarId};
use crate::nsf::cache::CacheComputation;
use crate::nsf::{Computation, Cubes};

/// `-d` CLI values selecting a §4.3 variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySchemeKind {
    Naive,
    Simple,
    Standard,
    Dynamic,
}

/// Configuration mirroring §4.4's option table one-to-one.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub max_global_nsf_size: i64,
    pub max_bdd_size: usize,
    pub opt_interval: u32,
    pub unsat_check_interval: u32,
    pub sort_before_joining: bool,
    pub dependency_scheme: DependencySchemeKind,
    pub disable_cache: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        ManagerOptions {
            max_global_nsf_size: 1000,
            max_bdd_size: 3000,
            opt_interval: 4,
            unsat_check_interval: 2,
            sort_before_joining: false,
            dependency_scheme: DependencySchemeKind::Naive,
            disable_cache: false,
        }
    }
}

/// A live Computation the manager owns: either the plain NSF or the cached
/// variant, picked once at construction time by `disableCache`.
#[derive(Clone)]
pub enum ManagedComputation {
    Plain(Computation),
    Cached(CacheComputation),
}

impl ManagedComputation {
    pub fn leaves_count(&self) -> u64 {
        match self {
            ManagedComputation::Plain(c) => c.leaves_count(),
            ManagedComputation::Cached(c) => c.leaves_count(),
        }
    }

    pub fn evaluate(&self, manager: &BddManager, cubes: &Cubes) -> DriverResult<Bdd> {
        Ok(match self {
            ManagedComputation::Plain(c) => c.evaluate(manager, cubes)?,
            ManagedComputation::Cached(c) => c.evaluate(manager, cubes)?,
        })
    }

    pub fn decide(&self, manager: &BddManager, cubes: &Cubes) -> DriverResult<Outcome> {
        Ok(match self {
            ManagedComputation::Plain(c) => c.decide(manager, cubes)?,
            ManagedComputation::Cached(c) => c.decide(manager, cubes)?,
        })
    }

    pub fn is_unsat(&self, manager: &BddManager) -> bool {
        match self {
            ManagedComputation::Plain(c) => c.is_unsat(manager),
            ManagedComputation::Cached(c) => c.is_unsat(manager),
        }
    }

    pub fn set_keep_first_level(&mut self, keep: bool) {
        match self {
            ManagedComputation::Plain(c) => c.set_keep_first_level(keep),
            ManagedComputation::Cached(c) => c.set_keep_first_level(keep),
        }
    }
}

pub struct ComputationManager {
    options: ManagerOptions,
    scheme: Scheme,
    /// Running approximation of the product of leaves counts across all
    /// live Computations the manager currently owns.
    global_estimate: f64,
    mutating_op_count: u32,
    conjunct_count: u32,
    split_side_left: bool,
}

impl ComputationManager {
    pub fn new(options: ManagerOptions, hypergraph: &Hypergraph, quantifier_block_count: usize) -> Self {
        let options = if options.disable_cache {
            ManagerOptions {
                max_global_nsf_size: -1,
                max_bdd_size: 0,
                dependency_scheme: DependencySchemeKind::Naive,
                ..options
            }
        } else {
            options
        };
        let scheme = match options.dependency_scheme {
            DependencySchemeKind::Naive => Scheme::Naive(Naive),
            DependencySchemeKind::Simple => Scheme::Simple(crate::dependency::Simple),
            DependencySchemeKind::Standard => Scheme::Standard(Standard::build(hypergraph)),
            DependencySchemeKind::Dynamic => {
                Scheme::Dynamic(Dynamic::select(hypergraph, quantifier_block_count))
            }
        };
        ComputationManager {
            options,
            scheme,
            global_estimate: 1.0,
            mutating_op_count: 0,
            conjunct_count: 0,
            split_side_left: false,
        }
    }

    pub fn uses_cache(&self) -> bool {
        !self.options.disable_cache
    }

    /// `newComputation(quantifierSequence, cubes(bag), clauses(bag))`.
    pub fn new_computation(
        &mut self,
        quantifier_sequence: QuantifierSequence,
        initial: Bdd,
    ) -> ManagedComputation {
        let computation = Computation::new(quantifier_sequence, initial, 0, false);
        self.track_new(computation.leaves_count());
        if self.uses_cache() {
            ManagedComputation::Cached(CacheComputation::new(computation, self.options.max_bdd_size))
        } else {
            ManagedComputation::Plain(computation)
        }
    }

    fn track_new(&mut self, leaves: u64) {
        self.update_estimate(1, leaves.max(1));
    }

    fn update_estimate(&mut self, old: u64, new: u64) {
        if self.options.max_global_nsf_size > 0 {
            self.global_estimate = (self.global_estimate / old.max(1) as f64 * new.max(1) as f64).max(1.0);
        }
    }

    pub fn global_estimate(&self) -> f64 {
        self.global_estimate
    }

    fn budget_exceeded(&self) -> bool {
        self.options.max_global_nsf_size > 0 && self.global_estimate > self.options.max_global_nsf_size as f64
    }

    /// `conjunct`: joins `left` and `right`, consuming both, applying
    /// `sortBeforeJoining` and the unsat-check cadence.
    pub fn conjunct(
        &mut self,
        manager: &BddManager,
        cubes: &Cubes,
        left: ManagedComputation,
        right: ManagedComputation,
    ) -> DriverResult<ManagedComputation> {
        let old_leaves = left.leaves_count() + right.leaves_count();
        let mut merged = match (left, right) {
            (ManagedComputation::Plain(mut a), ManagedComputation::Plain(b)) => {
                if self.options.sort_before_joining {
                    sort_children(&mut a, manager);
                }
                a.conjunct(b)?;
                ManagedComputation::Plain(a)
            }
            (ManagedComputation::Cached(mut a), ManagedComputation::Cached(b)) => {
                if self.options.sort_before_joining {
                    sort_children(&mut a.inner, manager);
                }
                a.inner.conjunct(b.inner)?;
                ManagedComputation::Cached(a)
            }
            _ => unreachable!("manager only ever mixes Computations of the same kind"),
        };
        self.update_estimate(old_leaves.max(1), merged.leaves_count().max(1));
        self.mutating_op_count += 1;
        self.conjunct_count += 1;

        self.optimize_if_due(manager, &mut merged)?;

        if self.options.unsat_check_interval > 0 && self.conjunct_count % self.options.unsat_check_interval == 0 {
            let outcome = merged.decide(manager, cubes)?;
            if outcome == Outcome::Unsat {
                return Err(Abort { reason: "intermediate decide() returned UNSAT after conjunct" }.into());
            }
        }
        Ok(merged)
    }

    /// `removeApply`: forget `levels` (with per-level cubes in `removed`)
    /// after conjoining `clauses`, consulting the dependency scheme for
    /// every candidate variable in `forgettable_vars`.
    pub fn remove_apply(
        &mut self,
        manager: &BddManager,
        mut computation: ManagedComputation,
        hypergraph: &Hypergraph,
        forgettable_vars: &[VarId],
        live_vars: &FxHashSet<VarId>,
        removed: &Cubes,
        clauses_by_var: &[(Bdd, Vec<VarId>)],
        clauses_conjunction: &Bdd,
    ) -> DriverResult<ManagedComputation> {
        let ctx = SubtreeContext { hypergraph, live_vars };
        let levels: Vec<usize> = forgettable_vars
            .iter()
            .filter(|&&v| self.scheme.may_abstract(&ctx, v))
            .map(|&v| hypergraph.level(v))
            .collect();

        let old_leaves = computation.leaves_count();
        match &mut computation {
            ManagedComputation::Plain(c) => {
                c.remove_apply(removed, &levels, clauses_conjunction)?;
            }
            ManagedComputation::Cached(c) => {
                c.remove_apply(
                    removed,
                    &levels,
                    clauses_by_var,
                    |v| hypergraph.level(v),
                    |v| live_vars.contains(&v),
                )?;
            }
        }
        self.update_estimate(old_leaves.max(1), computation.leaves_count().max(1));
        self.mutating_op_count += 1;
        self.optimize_if_due(manager, &mut computation)?;
        Ok(computation)
    }

    /// `optInterval`: runs the split loop once every o-th mutating
    /// operation, 0 disables it entirely.
    fn optimize_if_due(&mut self, manager: &BddManager, computation: &mut ManagedComputation) -> DriverResult<()> {
        if self.options.opt_interval == 0 || self.mutating_op_count % self.options.opt_interval != 0 {
            return Ok(());
        }
        self.optimize_loop(manager, computation)
    }

    /// Drive `optimize` split attempts until the leaf-size bound is met or
    /// the global estimator would be exceeded by continuing.
    pub fn optimize_loop(&mut self, manager: &BddManager, computation: &mut ManagedComputation) -> DriverResult<()> {
        loop {
            if self.budget_exceeded() {
                break;
            }
            let split_side_left = self.split_side_left;
            self.split_side_left = !self.split_side_left;
            let old_leaves = computation.leaves_count();
            let split = match computation {
                ManagedComputation::Plain(c) => c.optimize(manager, self.options.max_bdd_size, split_side_left)?,
                ManagedComputation::Cached(c) => c.optimize(manager, split_side_left)?,
            };
            self.update_estimate(old_leaves.max(1), computation.leaves_count().max(1));
            if !split {
                break;
            }
        }
        Ok(())
    }
}

fn sort_children(computation: &mut Computation, manager: &BddManager) {
    use crate::nsf::Node;
    fn sort_rec(node: &mut Node, manager: &BddManager) {
        if let Node::Inner { children, .. } = node {
            for child in children.iter_mut() {
                sort_rec(child, manager);
            }
            children.sort_by_key(|c| match c {
                Node::Leaf(b) => b.size(manager),
                Node::Inner { .. } => usize::MAX,
            });
        }
    }
    sort_rec(&mut computation.root, manager);
}
