//! Quantifier levels: the alternating ∃/∀ prefix that indexes every cube,
//! cache entry, and dependency-scheme query in this crate.

use std::fmt;

/// One block of the quantifier prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Exists,
    Forall,
}

impl Quantifier {
    pub fn flip(self) -> Quantifier {
        match self {
            Quantifier::Exists => Quantifier::Forall,
            Quantifier::Forall => Quantifier::Exists,
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quantifier::Exists => "exists",
            Quantifier::Forall => "forall",
        })
    }
}

/// `Q_1 .. Q_n`, one entry per quantifier block, indexed `0..n` for levels
/// `1..=n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantifierSequence(Vec<Quantifier>);

impl QuantifierSequence {
    pub fn new(blocks: Vec<Quantifier>) -> Self {
        Self(blocks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Quantifier governing 1-indexed level `level`.
    pub fn at(&self, level: usize) -> Quantifier {
        self.0[level - 1]
    }

    pub fn as_slice(&self) -> &[Quantifier] {
        &self.0
    }

    pub fn first(&self) -> Option<Quantifier> {
        self.0.first().copied()
    }
}

/// 1-indexed propositional variable identifier, matching QDIMACS numbering.
pub type VarId = u32;
