//! The CLI surface. `spec.md` §1/§6 explicitly scope option parsing out of
//! the core ("Exact flag spellings are not part of the core contract"),
//! but a runnable binary needs one; grounded on `clap`'s derive API the
//! way `examples/tirix-metamath-knife` wires its own command-line options.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::decomposition::EliminationHeuristic;
use crate::manager::DependencySchemeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DepSchemeArg {
    Naive,
    Simple,
    Standard,
    Dynamic,
}

impl From<DepSchemeArg> for DependencySchemeKind {
    fn from(value: DepSchemeArg) -> Self {
        match value {
            DepSchemeArg::Naive => DependencySchemeKind::Naive,
            DepSchemeArg::Simple => DependencySchemeKind::Simple,
            DepSchemeArg::Standard => DependencySchemeKind::Standard,
            DepSchemeArg::Dynamic => DependencySchemeKind::Dynamic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EliminationArg {
    MinFill,
    MinDegree,
    Mcs,
    Natural,
}

impl From<EliminationArg> for EliminationHeuristic {
    fn from(value: EliminationArg) -> Self {
        match value {
            EliminationArg::MinFill => EliminationHeuristic::MinFill,
            EliminationArg::MinDegree => EliminationHeuristic::MinDegree,
            EliminationArg::Mcs => EliminationHeuristic::Mcs,
            EliminationArg::Natural => EliminationHeuristic::Natural,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FitnessArg {
    Width,
    Height,
    JoinCount,
    JoinBagSize,
    JoinChildCount,
    JoinBagSizeExp,
    JoinChildBagSize,
    EstJoinEffort,
    RemovalImpact,
    RemovalJoinMin,
    RemovalJoinMax,
    VariablePosition,
    RemovedLevel,
}

/// Dynamic-programming QBF solver over a tree decomposition, using nested
/// structures of formulas (NSF) of BDDs.
#[derive(Debug, Parser)]
#[command(name = "qbf-nsf-solver", version, about)]
pub struct Cli {
    /// QDIMACS input file.
    pub input: PathBuf,

    /// Upper bound on the product of leaves counts across all live
    /// Computations; zero or negative disables the check.
    #[arg(short = 'e', long = "max-est-nsf-size", default_value_t = 1000)]
    pub max_est_nsf_size: i64,

    /// Per-leaf BDD size beyond which `optimize` attempts a split.
    #[arg(short = 'b', long = "max-bdd-size", default_value_t = 3000)]
    pub max_bdd_size: usize,

    /// Run `optimize` once every this-many mutating operations; 0 disables.
    #[arg(short = 'o', long = "opt-interval", default_value_t = 4)]
    pub opt_interval: u32,

    /// Call `decide` after every this-many `conjunct`s and abort early on
    /// UNSAT; 0 disables.
    #[arg(short = 'u', long = "unsat-check", default_value_t = 2)]
    pub unsat_check_interval: u32,

    /// Sort both operands' children by increasing BDD size before every
    /// `conjunct`.
    #[arg(long = "sort-before-joining", default_value_t = false)]
    pub sort_before_joining: bool,

    /// Dependency scheme governing early variable abstraction.
    #[arg(short = 'd', long = "dep-scheme", value_enum, default_value_t = DepSchemeArg::Naive)]
    pub dependency_scheme: DepSchemeArg,

    /// Force a plain Computation: equivalent to `-e -1 -b 0 -d naive`.
    #[arg(long = "disable-cache", default_value_t = false)]
    pub disable_cache: bool,

    /// Bucket-elimination heuristic used to build the tree decomposition.
    #[arg(short = 'h', long = "elimination", value_enum, default_value_t = EliminationArg::MinFill)]
    pub elimination: EliminationArg,

    /// Fitness function scoring candidate decompositions.
    #[arg(long = "decomposition-fitness", value_enum, default_value_t = FitnessArg::Width)]
    pub decomposition_fitness: FitnessArg,

    /// Number of candidate decompositions (one per restart of bucket
    /// elimination) to build and score, keeping the fittest.
    #[arg(long = "decomposition-iterations", default_value_t = 1)]
    pub decomposition_iterations: u32,

    /// Enumerate satisfying assignments to the outermost ∃ block.
    #[arg(long = "enumerate", default_value_t = false)]
    pub enumerate: bool,

    /// Print decomposition and NSF size statistics to stderr.
    #[arg(long = "print-stats", default_value_t = false)]
    pub print_stats: bool,

    /// Increase log verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
