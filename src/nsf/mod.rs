//! Component B — the Nested Structure of Formulas (NSF).
//!
//! A `Computation` is the tagged leaf/inner tree described by the
//! specification's data model: a leaf holds a single accumulated BDD, an
//! inner node holds a quantifier tag and a non-empty multiset of children.
//! The cached variant (component C) lives in [`cache`] and wraps a plain
//! `Computation` with a per-level `removeCache`.
//!
//! Storing children in a flat `Vec` owned by the parent (rather than, say,
//! `Rc<RefCell<…>>` links) mirrors the "flat growable buffer" design note
//! and gives the deep-clone `Clone` derive for free.

pub mod cache;

use rustc_hash::FxHashMap;

use crate::bdd::{Bdd, BddManager};
use crate::error::{Outcome, SolverError, SolverResult};
use crate::level::{Quantifier, QuantifierSequence};

/// Per-level cubes of currently-live variables, as threaded through every
/// operator by the specification's §4.1 "inputs common to all operators".
#[derive(Debug, Clone, Default)]
pub struct Cubes(FxHashMap<usize, Bdd>);

impl Cubes {
    pub fn new() -> Self {
        Cubes(FxHashMap::default())
    }

    pub fn set(&mut self, level: usize, cube: Bdd) {
        self.0.insert(level, cube);
    }

    pub fn get(&self, level: usize) -> Option<&Bdd> {
        self.0.get(&level)
    }
}

/// The leaf/inner tagged tree. Kept separate from [`Computation`] so the
/// root-only metadata (quantifier sequence, depth, `keepFirstLevel`) is not
/// duplicated at every nesting level.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(Bdd),
    Inner {
        quantifier: Quantifier,
        children: Vec<Node>,
    },
}

impl Node {
    /// Product of children counts along any root-to-leaf path — §3's
    /// `leavesCount`.
    pub fn leaves_count(&self) -> u64 {
        match self {
            Node::Leaf(_) => 1,
            Node::Inner { children, .. } => {
                children.iter().map(Node::leaves_count).sum::<u64>().max(1)
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Inner { children, .. } => 1 + children[0].depth(),
        }
    }
}

/// A Nested Structure of Formulas: the root-level metadata plus its tree.
#[derive(Debug, Clone)]
pub struct Computation {
    pub root: Node,
    pub quantifier_sequence: QuantifierSequence,
    /// Number of outer levels already abstracted below this subtree — §3:
    /// "a Computation of depth d represents quantification from level d+1
    /// downward".
    pub depth: usize,
    pub keep_first_level: bool,
}

impl Computation {
    /// `newComputation`: a single leaf holding `clauses` already conjoined.
    pub fn new(
        quantifier_sequence: QuantifierSequence,
        initial: Bdd,
        depth: usize,
        keep_first_level: bool,
    ) -> Self {
        Computation {
            root: Node::Leaf(initial),
            quantifier_sequence,
            depth,
            keep_first_level,
        }
    }

    pub fn leaves_count(&self) -> u64 {
        self.root.leaves_count()
    }

    /// Used by the solver driver just before the final `evaluate`, when
    /// enumeration has been requested and Q₁ = ∃.
    pub fn set_keep_first_level(&mut self, keep: bool) {
        self.keep_first_level = keep;
    }

    /// The quantifier level this Computation is currently resolving down
    /// from — the level a split's new inner node would alternate against.
    pub fn current_level(&self) -> usize {
        self.depth + 1
    }

    fn quantifier_at(&self, level: usize) -> Quantifier {
        self.quantifier_sequence.at(level)
    }

    // -- apply ---------------------------------------------------------

    /// `apply(cubes, f)`: pointwise transform every leaf's BDD with `f`.
    pub fn apply(&mut self, f: &impl Fn(&Bdd) -> SolverResult<Bdd>) -> SolverResult<()> {
        apply_node(&mut self.root, f)
    }

    /// `apply(cubes, clauses)` sugar: conjoin `clauses` into every leaf.
    pub fn apply_clauses(&mut self, clauses: &Bdd) -> SolverResult<()> {
        self.apply(&|b: &Bdd| b.and(clauses))
    }

    // -- conjunct --------------------------------------------------------

    /// `conjunct(other)`: requires identical quantifier sequence and depth.
    /// Consumes `other`.
    pub fn conjunct(&mut self, other: Computation) -> SolverResult<()> {
        debug_assert_eq!(
            self.quantifier_sequence, other.quantifier_sequence,
            "conjunct requires identical quantifier sequences"
        );
        debug_assert_eq!(self.depth, other.depth, "conjunct requires identical depth");
        debug_assert_eq!(
            self.root.depth(),
            other.root.depth(),
            "conjunct operands must have uniform, matching leaf depth"
        );
        let level = self.current_level();
        let sequence = self.quantifier_sequence.clone();
        let placeholder = Node::Inner {
            quantifier: Quantifier::Exists,
            children: Vec::new(),
        };
        self.root = conjunct_node(
            std::mem::replace(&mut self.root, placeholder),
            other.root,
            level,
            &sequence,
        )?;
        Ok(())
    }

    // -- remove ----------------------------------------------------------

    /// `remove(variable, level)`: abstract a single variable at its level.
    /// Per §4.1's policy note, only called for a variable whose level is
    /// the last outstanding level at every leaf — so recursion always
    /// drills straight to the leaves.
    pub fn remove(&mut self, var: &Bdd, level: usize) -> SolverResult<()> {
        let q = self.quantifier_at(level);
        remove_node(&mut self.root, var, q)?;
        if level == self.current_level() {
            self.depth += 1;
        }
        Ok(())
    }

    /// `remove(removedVertices)`: bulk remove, one cube per level.
    pub fn remove_bulk(&mut self, removed: &Cubes, levels: &[usize]) -> SolverResult<()> {
        for &level in levels {
            if let Some(cube) = removed.get(level) {
                let q = self.quantifier_at(level);
                remove_cube_node(&mut self.root, cube, q)?;
            }
            if level == self.current_level() {
                self.depth += 1;
            }
        }
        Ok(())
    }

    /// `removeApply(removedVertices, cubes, clauses)`: the fused
    /// forget+introduce operator. `clauses` is conjoined into every leaf
    /// *before* abstraction, since a newly-introduced clause may mention a
    /// variable this call is about to forget.
    pub fn remove_apply(
        &mut self,
        removed: &Cubes,
        levels: &[usize],
        clauses: &Bdd,
    ) -> SolverResult<()> {
        self.apply_clauses(clauses)?;
        self.remove_bulk(removed, levels)
    }

    // -- evaluate / decide -------------------------------------------------

    /// `evaluate(cubes, keepFirstLevel) → B`: bottom-up abstraction down to
    /// a single BDD.
    pub fn evaluate(&self, manager: &BddManager, cubes: &Cubes) -> SolverResult<Bdd> {
        eval_node(&self.root, self.current_level(), &self.quantifier_sequence, manager, cubes, self.keep_first_level)
    }

    pub fn decide(&self, manager: &BddManager, cubes: &Cubes) -> SolverResult<Outcome> {
        let result = self.evaluate(manager, cubes)?;
        Ok(if result.is_true(manager) {
            Outcome::Sat
        } else if result.is_false(manager) {
            Outcome::Unsat
        } else {
            Outcome::Undecided
        })
    }

    /// `isUnsat()`: cheap conservative check — a leaf of 0 reached under a
    /// purely conjunctive (∃) path of parents makes the whole branch 0,
    /// without needing a full `evaluate`.
    pub fn is_unsat(&self, manager: &BddManager) -> bool {
        is_unsat_node(&self.root, manager)
    }

    // -- optimize ----------------------------------------------------------

    /// `optimize(splitSideLeft)`: one split attempt plus subsumption
    /// compression at every inner node. Returns true iff a split occurred.
    pub fn optimize(
        &mut self,
        manager: &BddManager,
        max_bdd_size: usize,
        split_side_left: bool,
    ) -> SolverResult<bool> {
        compress_node(&mut self.root, manager)?;
        split_one(&mut self.root, manager, max_bdd_size, self.current_level(), &self.quantifier_sequence, split_side_left)
    }
}

fn apply_node(node: &mut Node, f: &impl Fn(&Bdd) -> SolverResult<Bdd>) -> SolverResult<()> {
    match node {
        Node::Leaf(b) => {
            *b = f(b)?;
            Ok(())
        }
        Node::Inner { children, .. } => {
            for child in children {
                apply_node(child, f)?;
            }
            Ok(())
        }
    }
}

/// Whether `node` already is a genuine same-level combine node for
/// `true_q` determines how it participates in `conjunct_node`: if its own
/// tag matches `true_q`, it was built (by an earlier `conjunct` or a
/// *non*-split tree) to represent this level directly, and its children
/// already are the next-level subtrees, safe to merge in place. Anything
/// else — a leaf, or an inner node `optimize`'s split produced, whose tag
/// is deliberately the *flip* of `true_q` (§4.1's split trick) — still
/// represents a single unit at this level and must stay wrapped as one
/// opaque child, never flattened into the level's union/cross-product.
fn into_children_at_level(node: Node, true_q: Quantifier) -> Vec<Node> {
    match node {
        Node::Inner { quantifier, children } if quantifier == true_q => children,
        other => vec![other],
    }
}

/// `conjunct(other)`'s structural recursion. The union-vs-cross-product
/// choice at every position is governed by `sequence.at(level)`, the
/// level's *true* quantifier — never by either operand's own node tag,
/// which `optimize`'s split deliberately sets to the flip of the true
/// quantifier for exactly one leaf's cofactor decomposition (§4.1).
fn conjunct_node(a: Node, b: Node, level: usize, sequence: &QuantifierSequence) -> SolverResult<Node> {
    if let (Node::Leaf(x), Node::Leaf(y)) = (&a, &b) {
        return Ok(Node::Leaf(x.and(y)?));
    }
    let true_q = sequence.at(level);
    let mut left_children = into_children_at_level(a, true_q);
    let right_children = into_children_at_level(b, true_q);
    match true_q {
        Quantifier::Exists => {
            left_children.extend(right_children);
            Ok(Node::Inner { quantifier: Quantifier::Exists, children: left_children })
        }
        Quantifier::Forall => {
            let mut product = Vec::with_capacity(left_children.len() * right_children.len());
            for l in &left_children {
                for r in &right_children {
                    product.push(conjunct_node(l.clone(), r.clone(), level + 1, sequence)?);
                }
            }
            Ok(Node::Inner { quantifier: Quantifier::Forall, children: product })
        }
    }
}

fn remove_node(node: &mut Node, var: &Bdd, level_quantifier: Quantifier) -> SolverResult<()> {
    match node {
        Node::Leaf(b) => {
            *b = b.abstract_with(var, level_quantifier)?;
            Ok(())
        }
        Node::Inner { children, .. } => {
            for child in children {
                remove_node(child, var, level_quantifier)?;
            }
            Ok(())
        }
    }
}

fn remove_cube_node(node: &mut Node, cube: &Bdd, level_quantifier: Quantifier) -> SolverResult<()> {
    remove_node(node, cube, level_quantifier)
}

fn eval_node(
    node: &Node,
    level: usize,
    sequence: &QuantifierSequence,
    manager: &BddManager,
    cubes: &Cubes,
    keep_first_level: bool,
) -> SolverResult<Bdd> {
    match node {
        Node::Leaf(b) => {
            // A leaf may still carry variables from every remaining level
            // down to n; abstract them all, innermost first.
            let mut acc = b.clone();
            for l in (level..=sequence.len()).rev() {
                if l == 1 && keep_first_level {
                    continue;
                }
                if let Some(cube) = cubes.get(l) {
                    acc = acc.abstract_with(cube, sequence.at(l))?;
                }
            }
            Ok(acc)
        }
        Node::Inner { quantifier, children } => {
            let mut combined: Option<Bdd> = None;
            for child in children {
                let child_value = eval_node(child, level + 1, sequence, manager, cubes, keep_first_level)?;
                combined = Some(match (&combined, quantifier) {
                    (None, _) => child_value,
                    (Some(acc), Quantifier::Exists) => acc.and(&child_value)?,
                    (Some(acc), Quantifier::Forall) => acc.or(&child_value)?,
                });
            }
            let combined = combined.unwrap_or_else(|| manager.one());
            if level == 1 && keep_first_level {
                Ok(combined)
            } else if let Some(cube) = cubes.get(level) {
                combined.abstract_with(cube, sequence.at(level))
            } else {
                Ok(combined)
            }
        }
    }
}

fn is_unsat_node(node: &Node, manager: &BddManager) -> bool {
    match node {
        Node::Leaf(b) => b.is_false(manager),
        Node::Inner { quantifier: Quantifier::Exists, children } => {
            children.iter().any(|c| is_unsat_node(c, manager))
        }
        Node::Inner { quantifier: Quantifier::Forall, children } => {
            !children.is_empty() && children.iter().all(|c| is_unsat_node(c, manager))
        }
    }
}

/// Subset-subsumption compression: at an ∃ node drop a child whose BDD is
/// implied by a sibling's; at a ∀ node drop a child implying a sibling's.
/// Only applied when every child is a bare leaf — nested structure makes
/// "implies" require a full `evaluate`, which optimize intentionally
/// avoids paying for at every call.
fn compress_node(node: &mut Node, manager: &BddManager) -> SolverResult<()> {
    if let Node::Inner { quantifier, children } = node {
        for child in children.iter_mut() {
            compress_node(child, manager)?;
        }
        let leaves: Vec<Option<Bdd>> = children
            .iter()
            .map(|c| match c {
                Node::Leaf(b) => Some(b.clone()),
                _ => None,
            })
            .collect();
        if leaves.iter().all(Option::is_some) {
            let leaves: Vec<Bdd> = leaves.into_iter().map(Option::unwrap).collect();
            let mut keep = vec![true; leaves.len()];
            for i in 0..leaves.len() {
                if !keep[i] {
                    continue;
                }
                for j in 0..leaves.len() {
                    if i == j || !keep[j] {
                        continue;
                    }
                    let implied = match quantifier {
                        // i implies j: i ∧ ¬j is unsat
                        Quantifier::Exists => leaves[i].and(&leaves[j].not()?)?.is_false(manager),
                        // i implies j: ¬i ∨ j is valid, i.e. i ∧ ¬j unsat too
                        Quantifier::Forall => leaves[j].and(&leaves[i].not()?)?.is_false(manager),
                    };
                    if implied && keep.iter().filter(|&&k| k).count() > 1 {
                        match quantifier {
                            Quantifier::Exists => keep[i] = false,
                            Quantifier::Forall => keep[j] = false,
                        }
                    }
                }
            }
            let mut kept_children = Vec::new();
            for (idx, node) in children.drain(..).enumerate() {
                if keep[idx] {
                    kept_children.push(node);
                }
            }
            *children = kept_children;
        }
    }
    Ok(())
}

/// Recurse to find the smallest-exceeding leaf and split it in place.
/// Returns true iff a split occurred.
fn split_one(
    node: &mut Node,
    manager: &BddManager,
    max_bdd_size: usize,
    level: usize,
    sequence: &QuantifierSequence,
    split_side_left: bool,
) -> SolverResult<bool> {
    match node {
        Node::Leaf(b) => {
            let size = b.size(manager);
            if size <= max_bdd_size {
                return Ok(false);
            }
            let Some(var) = manager.top_var(b) else {
                return Ok(false);
            };
            let (lo, hi) = b.cofactors(&var)?;
            // Alternation invariant: this new node's tag must differ from
            // its enclosing quantifier, so it is the flip of the split
            // variable's own level.
            let tag = sequence.at(level).flip();
            let (first, second) = if split_side_left { (lo, hi) } else { (hi, lo) };
            *node = Node::Inner {
                quantifier: tag,
                children: vec![Node::Leaf(first), Node::Leaf(second)],
            };
            Ok(true)
        }
        Node::Inner { children, .. } => {
            for child in children {
                if split_one(child, manager, max_bdd_size, level + 1, sequence, split_side_left)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}
