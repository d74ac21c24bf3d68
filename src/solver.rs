//! Component F — the solver driver: post-order traversal of the tree
//! decomposition, issuing NSF operators per bag through the
//! `ComputationManager`.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::bdd::{Bdd, BddManager};
use crate::decomposition::DecompNode;
use crate::error::{DriverResult, Outcome};
use crate::hypergraph::{Hypergraph, QbfInstance};
use crate::level::{QuantifierSequence, VarId};
use crate::manager::{ComputationManager, ManagedComputation};
use crate::nsf::Cubes;

/// Per-bag variable handles the driver needs to build cubes and clause
/// conjunctions without re-deriving them at every recursive call.
pub struct VariableTable {
    pub vars: FxHashMap<VarId, Bdd>,
}

impl VariableTable {
    pub fn build(manager: &BddManager, instance: &QbfInstance) -> DriverResult<Self> {
        let mut vars = FxHashMap::default();
        // oxidd requires variables to be created in quantifier-level order
        // (see `BddManager::new_var`), so walk the prefix level by level.
        let mut by_level: Vec<Vec<VarId>> = vec![Vec::new(); instance.quantifiers.len() + 1];
        for v in instance.hypergraph.vertices() {
            by_level[instance.hypergraph.level(v)].push(v);
        }
        for level_vars in by_level.iter_mut() {
            level_vars.sort_unstable();
        }
        for level_vars in &by_level {
            for &v in level_vars {
                vars.insert(v, manager.new_var()?);
            }
        }
        Ok(VariableTable { vars })
    }

    pub fn get(&self, v: VarId) -> &Bdd {
        &self.vars[&v]
    }
}

fn clause_bdd(manager: &BddManager, vars: &VariableTable, clause: &crate::hypergraph::Clause) -> DriverResult<Bdd> {
    let mut acc = manager.zero();
    for (i, &v) in clause.vertices.iter().enumerate() {
        let lit = if clause.signs[i] {
            vars.get(v).clone()
        } else {
            vars.get(v).not()?
        };
        acc = acc.or(&lit)?;
    }
    Ok(acc)
}

fn cube_for(manager: &BddManager, vars: &VariableTable, vertices: &FxHashSet<VarId>) -> DriverResult<Bdd> {
    let mut acc = manager.one();
    for &v in vertices {
        acc = acc.and(vars.get(v))?;
    }
    Ok(acc)
}

fn cubes_for_bag(
    manager: &BddManager,
    vars: &VariableTable,
    hypergraph: &Hypergraph,
    bag: &[VarId],
) -> DriverResult<Cubes> {
    let mut by_level: FxHashMap<usize, Vec<VarId>> = FxHashMap::default();
    for &v in bag {
        by_level.entry(hypergraph.level(v)).or_default().push(v);
    }
    let mut cubes = Cubes::new();
    for (level, vs) in by_level {
        let set: FxHashSet<VarId> = vs.into_iter().collect();
        cubes.set(level, cube_for(manager, vars, &set)?);
    }
    Ok(cubes)
}

/// `compute(node) → Computation`: the solver driver's single recursive
/// entry point.
pub struct Solver<'a> {
    pub manager: &'a BddManager,
    pub comp_manager: ComputationManager,
    pub hypergraph: &'a Hypergraph,
    pub quantifier_sequence: QuantifierSequence,
    pub vars: &'a VariableTable,
}

impl<'a> Solver<'a> {
    pub fn compute(&mut self, node: &DecompNode) -> DriverResult<ManagedComputation> {
        match node {
            DecompNode::Leaf { bag } => self.compute_leaf(bag),
            DecompNode::Introduce { bag, child } => {
                let child_computation = self.compute(child)?;
                self.compute_introduce(bag, child, child_computation)
            }
            DecompNode::Forget { bag, child } => {
                let child_computation = self.compute(child)?;
                self.compute_forget(bag, child, child_computation)
            }
            DecompNode::Join { bag, left, right } => {
                let left_computation = self.compute(left)?;
                let right_computation = self.compute(right)?;
                self.compute_join(bag, left_computation, right_computation)
            }
        }
    }

    fn initial_bdd_for_bag(&self, bag: &[VarId]) -> DriverResult<Bdd> {
        let bag_set: FxHashSet<VarId> = bag.iter().copied().collect();
        let mut acc = self.manager.one();
        for clause in &self.hypergraph.clauses {
            if clause.vertices.iter().all(|v| bag_set.contains(v)) {
                acc = acc.and(&clause_bdd(self.manager, self.vars, clause)?)?;
            }
        }
        Ok(acc)
    }

    fn compute_leaf(&mut self, bag: &[VarId]) -> DriverResult<ManagedComputation> {
        let initial = self.initial_bdd_for_bag(bag)?;
        Ok(self.comp_manager.new_computation(self.quantifier_sequence.clone(), initial))
    }

    /// An introduce node adds exactly one vertex to the bag but does not
    /// yet bring in any clause that depends on it beyond what's already in
    /// scope; its NSF is unchanged structurally — clause introduction
    /// happens uniformly at the owning forget step via `removeApply`.
    fn compute_introduce(
        &mut self,
        _bag: &[VarId],
        _child: &DecompNode,
        child_computation: ManagedComputation,
    ) -> DriverResult<ManagedComputation> {
        Ok(child_computation)
    }

    fn compute_forget(
        &mut self,
        bag: &[VarId],
        child: &DecompNode,
        child_computation: ManagedComputation,
    ) -> DriverResult<ManagedComputation> {
        let parent_bag: FxHashSet<VarId> = bag.iter().copied().collect();
        let child_bag: FxHashSet<VarId> = child.bag().iter().copied().collect();
        let forgotten: Vec<VarId> = child_bag.difference(&parent_bag).copied().collect();

        let introduced_clauses: Vec<_> = self
            .hypergraph
            .clauses
            .iter()
            .filter(|c| {
                let vs: FxHashSet<VarId> = c.vertices.iter().copied().collect();
                vs.iter().all(|v| parent_bag.contains(v)) && !vs.iter().all(|v| child_bag.contains(v))
            })
            .collect();

        let mut clauses_conjunction = self.manager.one();
        let mut clauses_by_var = Vec::new();
        for clause in &introduced_clauses {
            let bdd = clause_bdd(self.manager, self.vars, clause)?;
            clauses_conjunction = clauses_conjunction.and(&bdd)?;
            clauses_by_var.push((bdd, clause.vertices.clone()));
        }

        let removed = cubes_for_bag(self.manager, self.vars, self.hypergraph, &forgotten)?;
        let live_vars: FxHashSet<VarId> = child_bag.clone();

        let result = self.comp_manager.remove_apply(
            self.manager,
            child_computation,
            self.hypergraph,
            &forgotten,
            &live_vars,
            &removed,
            &clauses_by_var,
            &clauses_conjunction,
        )?;

        if result.is_unsat(self.manager) {
            return Err(crate::error::Abort {
                reason: "forget step's removeApply produced an unsatisfiable leaf",
            }
            .into());
        }
        Ok(result)
    }

    fn compute_join(
        &mut self,
        bag: &[VarId],
        left: ManagedComputation,
        right: ManagedComputation,
    ) -> DriverResult<ManagedComputation> {
        let cubes = cubes_for_bag(self.manager, self.vars, self.hypergraph, bag)?;
        self.comp_manager.conjunct(self.manager, &cubes, left, right)
    }

    /// The root's `evaluate` into the final answer. `keepFirstLevel` must
    /// already have been set on `root` via
    /// [`ManagedComputation::set_keep_first_level`] iff enumeration was
    /// requested and Q₁ = ∃.
    pub fn finish(&self, root: &ManagedComputation, full_cubes: &Cubes) -> DriverResult<Outcome> {
        root.decide(self.manager, full_cubes)
    }
}
