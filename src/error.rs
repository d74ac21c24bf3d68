//! Error types for the solver core.
//!
//! The teacher crate never reaches for `thiserror`/`anyhow` — its own error
//! types (e.g. `oxidd_dump::visualize::Error`) are plain enums with a
//! hand-written `Display`/`Error` impl. We follow that here rather than
//! adding an error-handling dependency this crate doesn't otherwise need.

use std::fmt;

/// The three-valued answer a `Computation` can collapse to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sat,
    Unsat,
    Undecided,
}

impl Outcome {
    /// The process exit code §6 of the specification assigns to this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Sat => 10,
            Outcome::Unsat => 20,
            Outcome::Undecided => 0,
        }
    }
}

/// Fail-fast errors: malformed input or contradictory CLI options.
#[derive(Debug)]
pub enum SolverError {
    /// Empty instance, malformed quantifier prefix, truncated clause, etc.
    InvalidInput(String),
    /// Mutually exclusive options, or an option value outside its domain.
    InvalidOption(String),
    /// The BDD engine's manager ran out of node/cache capacity.
    ResourceExhaustion,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::InvalidInput(msg) => write!(f, "invalid QBF instance: {msg}"),
            SolverError::InvalidOption(msg) => write!(f, "invalid option: {msg}"),
            SolverError::ResourceExhaustion => {
                write!(f, "BDD engine exhausted its node/cache capacity")
            }
        }
    }
}

impl std::error::Error for SolverError {}

pub type SolverResult<T> = Result<T, SolverError>;

/// The single *expected* non-local exit described in §7: an intermediate
/// `decide` call on a partial NSF already returned UNSAT, so the whole
/// computation can stop early. Every other failure bubbles up as
/// [`SolverError`]; `Internal` invariant violations (depth mismatches,
/// non-uniform leaf depth, ...) are `debug_assert!`/`assert!` failures per
/// the specification's policy and are never converted into a `Result`.
#[derive(Debug)]
pub struct Abort {
    pub reason: &'static str,
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "intermediate unsat: {}", self.reason)
    }
}

impl std::error::Error for Abort {}

/// Errors that can escape the solver driver: either the expected
/// intermediate-UNSAT short circuit, or an ordinary [`SolverError`].
#[derive(Debug)]
pub enum DriverError {
    Aborted(Abort),
    Solver(SolverError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Aborted(a) => a.fmt(f),
            DriverError::Solver(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<SolverError> for DriverError {
    fn from(e: SolverError) -> Self {
        DriverError::Solver(e)
    }
}

impl From<Abort> for DriverError {
    fn from(a: Abort) -> Self {
        DriverError::Aborted(a)
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
