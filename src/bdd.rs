//! Component A — the BDD facade.
//!
//! `spec.md` §2 treats the BDD engine as an opaque black box behind `∧ ∨ ¬`,
//! restriction, existential/universal abstraction over a cube, size
//! measurement, and equality. This module is that facade: a thin wrapper
//! around [`oxidd::bdd::BDDFunction`] so that the rest of the crate (the NSF
//! layer, the manager, the solver driver) never touches `oxidd` directly.
//! `oxidd` is used here exactly the way the teacher crate itself is meant to
//! be used: allocate a manager once, build variables, combine functions
//! through `BooleanFunction`/`BooleanFunctionQuant`.

use oxidd::bdd::{new_manager, BDDFunction, BDDManagerRef};
use oxidd::{BooleanFunction, BooleanFunctionQuant, Function, ManagerRef};
use oxidd_core::util::Borrowed;
use oxidd_core::{HasLevel, Manager, Node};
use rustc_hash::FxHashSet;

use crate::error::{SolverError, SolverResult};
use crate::level::Quantifier;

/// A single opaque Boolean function handle — `B` in `spec.md`'s notation.
#[derive(Clone, PartialEq, Eq)]
pub struct Bdd(BDDFunction);

impl Bdd {
    pub fn and(&self, other: &Bdd) -> SolverResult<Bdd> {
        Ok(Bdd(self.0.and(&other.0)?))
    }

    pub fn or(&self, other: &Bdd) -> SolverResult<Bdd> {
        Ok(Bdd(self.0.or(&other.0)?))
    }

    pub fn not(&self) -> SolverResult<Bdd> {
        Ok(Bdd(self.0.not()?))
    }

    /// Existentially abstract every variable in `cube` (a conjunction of
    /// positive literals, per `spec.md`'s GLOSSARY) from `self`.
    pub fn exist(&self, cube: &Bdd) -> SolverResult<Bdd> {
        Ok(Bdd(self.0.exist(&cube.0)?))
    }

    /// Universally abstract every variable in `cube` from `self`.
    pub fn forall(&self, cube: &Bdd) -> SolverResult<Bdd> {
        Ok(Bdd(self.0.forall(&cube.0)?))
    }

    /// Abstract `self` over `cube` using whichever quantifier a caller has
    /// on hand symbolically — sugar `Computation::remove` relies on since it
    /// knows a level's quantifier long before it knows which BDD op that
    /// implies.
    pub fn abstract_with(&self, cube: &Bdd, quantifier: Quantifier) -> SolverResult<Bdd> {
        match quantifier {
            Quantifier::Exists => self.exist(cube),
            Quantifier::Forall => self.forall(cube),
        }
    }

    pub fn is_true(&self, manager: &BddManager) -> bool {
        manager.with_shared(|m| self.0 == BDDFunction::t(m))
    }

    pub fn is_false(&self, manager: &BddManager) -> bool {
        manager.with_shared(|m| self.0 == BDDFunction::f(m))
    }

    /// Reduced node count of this function alone (not the whole manager's
    /// unique table) — used to decide when `optimize` should split a leaf.
    /// `oxidd`'s `BooleanFunction` surface doesn't hand out a per-function
    /// node-count accessor directly, so this walks the DAG the same way
    /// `oxidd-rules-bdd`'s recursive `apply` algorithms do: `get_node`,
    /// match on `Node::Inner`/`Node::Terminal`, recurse into both children,
    /// dedup by edge identity since a reduced BDD is a DAG, not a tree.
    pub fn size(&self, manager: &BddManager) -> usize {
        manager.with_shared(|m| {
            let mut seen = FxHashSet::default();
            count_nodes(m, self.0.as_edge(m).borrowed(), &mut seen)
        })
    }

    /// Shannon cofactors `(self|var=0, self|var=1)`.
    pub fn cofactors(&self, var: &Bdd) -> SolverResult<(Bdd, Bdd)> {
        let not_var = var.not()?;
        let lo = self.and(&not_var)?.exist(var)?;
        let hi = self.and(var)?.exist(var)?;
        Ok((lo, hi))
    }
}

fn count_nodes<'a, M>(manager: &'a M, edge: Borrowed<'a, M::Edge>, seen: &mut FxHashSet<Borrowed<'a, M::Edge>>) -> usize
where
    M: Manager,
    M::InnerNode: HasLevel,
{
    match manager.get_node(&edge) {
        Node::Terminal(_) => 0,
        Node::Inner(node) => {
            if !seen.insert(edge.borrowed()) {
                return 0;
            }
            let (t, e) = (node.child(0), node.child(1));
            1 + count_nodes(manager, t, seen) + count_nodes(manager, e, seen)
        }
    }
}

/// Owns the `oxidd` BDD manager plus the ordered list of variables this
/// crate created, so that `Computation::optimize`'s split can recover a
/// `Bdd` handle for "the topmost variable" from a level number.
pub struct BddManager {
    manager_ref: BDDManagerRef,
    vars_in_creation_order: std::cell::RefCell<Vec<Bdd>>,
}

impl Clone for BddManager {
    fn clone(&self) -> Self {
        BddManager {
            manager_ref: self.manager_ref.clone(),
            vars_in_creation_order: self.vars_in_creation_order.clone(),
        }
    }
}

impl BddManager {
    /// `inner_node_capacity`/`apply_cache_capacity` mirror the two knobs
    /// `oxidd::bdd::new_manager` exposes; the thread count is pinned to 1
    /// since §5 of the specification requires this core to stay
    /// single-threaded and synchronous.
    pub fn new(inner_node_capacity: usize, apply_cache_capacity: usize) -> Self {
        BddManager {
            manager_ref: new_manager(inner_node_capacity, apply_cache_capacity, 1),
            vars_in_creation_order: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub fn with_shared<T>(&self, f: impl FnOnce(&<BDDFunction as Function>::Manager<'_>) -> T) -> T {
        self.manager_ref.with_manager_shared(f)
    }

    pub fn with_exclusive<T>(&self, f: impl FnOnce(&mut <BDDFunction as Function>::Manager<'_>) -> T) -> T {
        self.manager_ref.with_manager_exclusive(f)
    }

    /// Create a fresh variable. Variables must be created in quantifier
    /// level order (outermost first) so that `oxidd`'s variable order
    /// matches the quantifier prefix — the precondition bucket-elimination
    /// QBF solving always relies on.
    pub fn new_var(&self) -> SolverResult<Bdd> {
        let v = Bdd(self.with_exclusive(BDDFunction::new_var)?);
        self.vars_in_creation_order.borrow_mut().push(v.clone());
        Ok(v)
    }

    pub fn one(&self) -> Bdd {
        self.with_shared(|m| Bdd(BDDFunction::t(m)))
    }

    pub fn zero(&self) -> Bdd {
        self.with_shared(|m| Bdd(BDDFunction::f(m)))
    }

    /// Conjunction of a set of variable handles — a *cube* in the sense
    /// `spec.md`'s GLOSSARY uses the term.
    pub fn cube<'a>(&self, vars: impl IntoIterator<Item = &'a Bdd>) -> SolverResult<Bdd> {
        let mut acc = self.one();
        for v in vars {
            acc = acc.and(v)?;
        }
        Ok(acc)
    }

    /// Recover the variable handle at `bdd`'s top level, used by
    /// `optimize`'s split rule ("the topmost variable in b").
    pub fn top_var(&self, bdd: &Bdd) -> Option<Bdd> {
        self.with_shared(|m| match m.get_node(bdd.0.as_edge(m)) {
            Node::Terminal(_) => None,
            Node::Inner(node) => {
                let level = node.level() as usize;
                self.vars_in_creation_order.borrow().get(level).cloned()
            }
        })
    }
}

impl From<oxidd::util::OutOfMemory> for SolverError {
    fn from(_: oxidd::util::OutOfMemory) -> Self {
        SolverError::ResourceExhaustion
    }
}
