//! The parsed-input data model `spec.md` §6 calls out as the external
//! interface boundary: "the core consumes an already-parsed representation:
//! a hypergraph ... and a vector of quantifier kinds per level, plus a
//! per-vertex integer label `level`."

use rustc_hash::FxHashMap;

use crate::level::{QuantifierSequence, VarId};

/// One clause: a hyperedge over variable vertices, with per-literal
/// polarity aligned to `vertices`, mirroring the `signs: vector<bool>` edge
/// label described in `spec.md` §6.
#[derive(Debug, Clone)]
pub struct Clause {
    pub vertices: Vec<VarId>,
    pub signs: Vec<bool>,
}

impl Clause {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// The primal hypergraph of a QBF matrix: vertices (variables) each carrying
/// a quantifier level, and hyperedges (clauses).
#[derive(Debug, Clone)]
pub struct Hypergraph {
    levels: FxHashMap<VarId, usize>,
    pub clauses: Vec<Clause>,
    num_vars: VarId,
}

impl Hypergraph {
    pub fn new(levels: FxHashMap<VarId, usize>, clauses: Vec<Clause>, num_vars: VarId) -> Self {
        Hypergraph {
            levels,
            clauses,
            num_vars,
        }
    }

    pub fn num_vars(&self) -> VarId {
        self.num_vars
    }

    pub fn level(&self, v: VarId) -> usize {
        self.levels[&v]
    }

    pub fn vertices(&self) -> impl Iterator<Item = VarId> + '_ {
        1..=self.num_vars
    }

    /// Other vertices sharing at least one clause with `v` — the primal
    /// graph's adjacency, used both by the bucket-elimination decomposer
    /// (component I) and the resolution-path dependency scheme (§4.3).
    pub fn neighbors(&self, v: VarId) -> impl Iterator<Item = VarId> + '_ {
        self.clauses
            .iter()
            .filter(move |c| c.vertices.contains(&v))
            .flat_map(|c| c.vertices.iter().copied())
            .filter(move |&u| u != v)
    }
}

/// A fully parsed QBF instance: hypergraph plus quantifier prefix.
#[derive(Debug, Clone)]
pub struct QbfInstance {
    pub hypergraph: Hypergraph,
    pub quantifiers: QuantifierSequence,
}

impl QbfInstance {
    pub fn quantifier_count(&self) -> usize {
        self.quantifiers.len()
    }
}
