//! Component C — `CacheComputation`: the LDM-style removal cache.
//!
//! §4.2 of the specification: clauses on forgotten vertices must stay
//! conjoinable until *all* their variables are abstracted, or soundness is
//! lost. This wraps a plain [`Computation`] and defers clauses that aren't
//! yet fully in scope into a per-level cache, injecting them the moment
//! they become ready.

use rustc_hash::FxHashMap;

use super::{Computation, Cubes, Node};
use crate::bdd::{Bdd, BddManager};
use crate::error::SolverResult;
use crate::level::VarId;

/// A clause pending conjunction, tagged with the variables it still
/// mentions that are not yet abstracted.
#[derive(Debug, Clone)]
struct PendingClause {
    bdd: Bdd,
    remaining_vars: Vec<VarId>,
}

/// `CacheComputation`: a `Computation` plus the root-only `removeCache`,
/// `maxBDDSize` bound, and (optionally) `alreadyAbstractedAtLevels`.
#[derive(Debug, Clone)]
pub struct CacheComputation {
    pub inner: Computation,
    /// level -> clauses deferred because not all their variables are yet
    /// abstracted.
    remove_cache: FxHashMap<usize, Vec<PendingClause>>,
    pub max_bdd_size: usize,
    /// Per-level set of vertex ids already abstracted inside this subtree
    /// — consulted by the standard dependency scheme.
    already_abstracted_at_levels: FxHashMap<usize, Vec<VarId>>,
}

impl CacheComputation {
    pub fn new(inner: Computation, max_bdd_size: usize) -> Self {
        CacheComputation {
            inner,
            remove_cache: FxHashMap::default(),
            max_bdd_size,
            already_abstracted_at_levels: FxHashMap::default(),
        }
    }

    pub fn leaves_count(&self) -> u64 {
        self.inner.leaves_count()
    }

    pub fn set_keep_first_level(&mut self, keep: bool) {
        self.inner.set_keep_first_level(keep);
    }

    pub fn already_abstracted(&self, level: usize) -> &[VarId] {
        self.already_abstracted_at_levels
            .get(&level)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Insert a clause whose variables are not all currently in scope,
    /// deferring it at the maximum level among its (remaining) variables.
    fn defer(&mut self, bdd: Bdd, remaining_vars: Vec<VarId>, level_of: impl Fn(VarId) -> usize) {
        let max_level = remaining_vars.iter().map(|&v| level_of(v)).max().unwrap_or(0);
        self.remove_cache
            .entry(max_level)
            .or_default()
            .push(PendingClause { bdd, remaining_vars });
    }

    /// `removeApply(removed, cubes, clauses)`: a clause is *ready* if every
    /// variable it mentions is either about to be removed now or already
    /// out of scope; ready clauses are conjoined immediately, the rest are
    /// deferred.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_apply(
        &mut self,
        removed: &Cubes,
        forgotten_levels: &[usize],
        clauses: &[(Bdd, Vec<VarId>)],
        level_of: impl Fn(VarId) -> usize + Copy,
        still_in_scope: impl Fn(VarId) -> bool,
    ) -> SolverResult<()> {
        for (bdd, vars) in clauses {
            let remaining: Vec<VarId> = vars
                .iter()
                .copied()
                .filter(|v| still_in_scope(*v))
                .collect();
            if remaining.is_empty() {
                self.inner.apply_clauses(bdd)?;
            } else {
                self.defer(bdd.clone(), remaining, level_of);
            }
        }

        self.inner.remove_bulk(removed, forgotten_levels)?;

        for &level in forgotten_levels {
            self.already_abstracted_at_levels
                .entry(level)
                .or_default();
            self.recheck_cache(level, &level_of, &still_in_scope)?;
        }
        Ok(())
    }

    /// Re-scan clauses deferred at `level` now that it has just been
    /// abstracted: any clause whose remaining variables are now all out of
    /// scope is conjoined and dropped from the cache.
    fn recheck_cache(
        &mut self,
        level: usize,
        level_of: &impl Fn(VarId) -> usize,
        still_in_scope: &impl Fn(VarId) -> bool,
    ) -> SolverResult<()> {
        if let Some(pending) = self.remove_cache.remove(&level) {
            for clause in pending {
                let remaining: Vec<VarId> = clause
                    .remaining_vars
                    .iter()
                    .copied()
                    .filter(|v| still_in_scope(*v))
                    .collect();
                if remaining.is_empty() {
                    self.inner.apply_clauses(&clause.bdd)?;
                } else {
                    let max_level = remaining.iter().map(|&v| level_of(v)).max().unwrap_or(level);
                    self.remove_cache
                        .entry(max_level)
                        .or_default()
                        .push(PendingClause {
                            bdd: clause.bdd,
                            remaining_vars: remaining,
                        });
                }
            }
        }
        Ok(())
    }

    pub fn optimize(&mut self, manager: &BddManager, split_side_left: bool) -> SolverResult<bool> {
        self.inner.optimize(manager, self.max_bdd_size, split_side_left)
    }

    pub fn evaluate(&self, manager: &BddManager, cubes: &Cubes) -> SolverResult<Bdd> {
        self.inner.evaluate(manager, cubes)
    }

    pub fn decide(&self, manager: &BddManager, cubes: &Cubes) -> SolverResult<crate::error::Outcome> {
        self.inner.decide(manager, cubes)
    }

    pub fn is_unsat(&self, manager: &BddManager) -> bool {
        self.inner.is_unsat(manager)
    }

    /// Root node, exposed for `ComputationManager`'s size accounting.
    pub fn root(&self) -> &Node {
        &self.inner.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::BddManager;
    use crate::level::{Quantifier, QuantifierSequence};

    #[test]
    fn ready_clause_is_conjoined_immediately() {
        let manager = BddManager::new(1 << 16, 1 << 10);
        let x1 = manager.new_var().unwrap();
        let seq = QuantifierSequence::new(vec![Quantifier::Exists]);
        let comp = Computation::new(seq, manager.one(), 0, false);
        let mut cached = CacheComputation::new(comp, 3000);

        let clause = x1.clone();
        cached
            .remove_apply(
                &Cubes::new(),
                &[],
                &[(clause, vec![1])],
                |_| 1,
                |_| false,
            )
            .unwrap();

        let mut cubes = Cubes::new();
        cubes.set(1, x1.clone());
        let result = cached.evaluate(&manager, &cubes).unwrap();
        assert!(!result.is_false(&manager));
    }
}
