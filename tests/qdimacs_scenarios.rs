//! End-to-end QDIMACS scenarios from `spec.md` §8, plus the boundary
//! instances (empty instance, empty-clause instance, single-block `⋁xᵢ`,
//! single-`∀`-block non-tautology). Mirrors the "integration test builds a
//! manager, builds functions, asserts on them" shape of
//! `examples/TarVK-oxidd/crates/oxidd/tests/visualization.rs`, substituting
//! the QDIMACS driver for manual `BDDFunction` construction.

use qbf_nsf_solver::bdd::BddManager;
use qbf_nsf_solver::decomposition::{build_decomposition, EliminationHeuristic};
use qbf_nsf_solver::error::{DriverError, Outcome};
use qbf_nsf_solver::manager::{ComputationManager, DependencySchemeKind, ManagerOptions};
use qbf_nsf_solver::nsf::Cubes;
use qbf_nsf_solver::qdimacs;
use qbf_nsf_solver::solver::{Solver, VariableTable};

fn solve(text: &str) -> Outcome {
    match try_solve(text, ManagerOptions::default()) {
        Ok(outcome) => outcome,
        Err(DriverError::Aborted(_)) => Outcome::Unsat,
        Err(DriverError::Solver(e)) => panic!("unexpected solver error: {e}"),
    }
}

fn try_solve(text: &str, options: ManagerOptions) -> Result<Outcome, DriverError> {
    let instance = qdimacs::parse(text)?;
    if instance.hypergraph.num_vars() == 0 {
        return Ok(Outcome::Sat);
    }
    if instance.hypergraph.clauses.iter().any(|c| c.is_empty()) {
        return Ok(Outcome::Unsat);
    }

    let manager = BddManager::new(1 << 16, 1 << 12);
    let vars = VariableTable::build(&manager, &instance)?;
    let decomposition = build_decomposition(&instance.hypergraph, EliminationHeuristic::MinFill);

    let comp_manager = ComputationManager::new(options, &instance.hypergraph, instance.quantifiers.len());
    let mut solver = Solver {
        manager: &manager,
        comp_manager,
        hypergraph: &instance.hypergraph,
        quantifier_sequence: instance.quantifiers.clone(),
        vars: &vars,
    };
    let root = solver.compute(&decomposition)?;

    let mut full_cubes = Cubes::new();
    let mut by_level: std::collections::HashMap<usize, Vec<u32>> = std::collections::HashMap::new();
    for v in instance.hypergraph.vertices() {
        by_level.entry(instance.hypergraph.level(v)).or_default().push(v);
    }
    for (level, vs) in by_level {
        let mut cube = manager.one();
        for v in vs {
            cube = cube.and(vars.get(v)).unwrap();
        }
        full_cubes.set(level, cube);
    }

    solver.finish(&root, &full_cubes)
}

#[test]
fn scenario_1_exists_block_satisfiable() {
    let text = "p cnf 2 2\ne 1 2 0\n1 2 0\n-1 -2 0\n";
    assert_eq!(solve(text), Outcome::Sat);
}

#[test]
fn scenario_2_alternating_prefix_unsat() {
    let text = "p cnf 2 4\ne 1 0\na 2 0\n1 2 0\n1 -2 0\n-1 2 0\n-1 -2 0\n";
    assert_eq!(solve(text), Outcome::Unsat);
}

#[test]
fn scenario_3_witness_exists_for_every_forall_value() {
    let text = "p cnf 3 2\na 1 0\ne 2 3 0\n1 2 0\n-1 3 0\n";
    assert_eq!(solve(text), Outcome::Sat);
}

#[test]
fn scenario_4_conflicting_unit_clauses_unsat() {
    let text = "p cnf 1 2\ne 1 0\n1 0\n-1 0\n";
    assert_eq!(solve(text), Outcome::Unsat);
}

#[test]
fn scenario_5_forall_defeats_every_exists_choice() {
    let text = "p cnf 4 3\ne 1 2 0\na 3 4 0\n1 3 0\n2 4 0\n-1 -2 0\n";
    assert_eq!(solve(text), Outcome::Unsat);
}

#[test]
fn boundary_empty_instance_is_sat() {
    let text = "p cnf 0 0\n";
    assert_eq!(solve(text), Outcome::Sat);
}

#[test]
fn boundary_empty_clause_is_unsat() {
    let text = "p cnf 1 1\ne 1 0\n0\n";
    assert_eq!(solve(text), Outcome::Unsat);
}

#[test]
fn boundary_single_exists_block_disjunction_is_sat() {
    let text = "p cnf 3 1\ne 1 2 3 0\n1 2 3 0\n";
    assert_eq!(solve(text), Outcome::Sat);
}

#[test]
fn boundary_single_forall_block_non_tautology_is_unsat() {
    let text = "p cnf 2 1\na 1 2 0\n1 2 0\n";
    assert_eq!(solve(text), Outcome::Unsat);
}

#[test]
fn scenario_1_holds_across_option_combinations() {
    let text = "p cnf 2 2\ne 1 2 0\n1 2 0\n-1 -2 0\n";
    for sort in [false, true] {
        for opt_interval in [0, 1, 4] {
            for dep in [
                DependencySchemeKind::Naive,
                DependencySchemeKind::Simple,
                DependencySchemeKind::Dynamic,
            ] {
                for max_bdd_size in [ManagerOptions::default().max_bdd_size, 1] {
                    let options = ManagerOptions {
                        sort_before_joining: sort,
                        opt_interval,
                        dependency_scheme: dep,
                        max_bdd_size,
                        ..ManagerOptions::default()
                    };
                    let outcome = match try_solve(text, options) {
                        Ok(o) => o,
                        Err(DriverError::Aborted(_)) => Outcome::Unsat,
                        Err(DriverError::Solver(e)) => panic!("unexpected solver error: {e}"),
                    };
                    assert_eq!(
                        outcome,
                        Outcome::Sat,
                        "sort={sort} opt_interval={opt_interval} max_bdd_size={max_bdd_size}"
                    );
                }
            }
        }
    }
}

/// Same sweep over a multi-variable-per-level instance (two universal
/// variables sharing level 1, two existential sharing level 2), so the
/// `max_bdd_size: 1` entries force `optimize` to actually cofactor-split a
/// multi-variable leaf rather than a trivially single-variable one. Picking
/// x3 = x4 = true satisfies `(x1 ∨ x2 ∨ x3) ∧ (¬x1 ∨ ¬x2 ∨ x4)` regardless
/// of x1, x2, so the instance is satisfiable.
#[test]
fn scenario_6_multi_variable_levels_holds_across_option_combinations() {
    let text = "p cnf 4 2\na 1 2 0\ne 3 4 0\n1 2 3 0\n-1 -2 4 0\n";
    for opt_interval in [0, 1] {
        for dep in [DependencySchemeKind::Naive, DependencySchemeKind::Standard] {
            for max_bdd_size in [ManagerOptions::default().max_bdd_size, 1, 2] {
                let options = ManagerOptions {
                    opt_interval,
                    dependency_scheme: dep,
                    max_bdd_size,
                    ..ManagerOptions::default()
                };
                let outcome = match try_solve(text, options) {
                    Ok(o) => o,
                    Err(DriverError::Aborted(_)) => Outcome::Unsat,
                    Err(DriverError::Solver(e)) => panic!("unexpected solver error: {e}"),
                };
                assert_eq!(
                    outcome,
                    Outcome::Sat,
                    "opt_interval={opt_interval} max_bdd_size={max_bdd_size}"
                );
            }
        }
    }
}
