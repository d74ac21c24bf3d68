use std::fs;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use qbf_nsf_solver::bdd::BddManager;
use qbf_nsf_solver::cli::Cli;
use qbf_nsf_solver::decomposition::{build_decomposition, DecompNode, EliminationHeuristic};
use qbf_nsf_solver::error::{DriverError, Outcome, SolverError};
use qbf_nsf_solver::fitness;
use qbf_nsf_solver::hypergraph::QbfInstance;
use qbf_nsf_solver::level::Quantifier;
use qbf_nsf_solver::manager::{ComputationManager, DependencySchemeKind, ManagedComputation, ManagerOptions};
use qbf_nsf_solver::nsf::Cubes;
use qbf_nsf_solver::qdimacs;
use qbf_nsf_solver::solver::{Solver, VariableTable};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new().with_level(level).init().ok();

    match run(&cli) {
        Ok(outcome) => {
            println!(
                "s cnf {}",
                match outcome {
                    Outcome::Sat => "SAT",
                    Outcome::Unsat => "UNSAT",
                    Outcome::Undecided => "UNKNOWN",
                }
            );
            ExitCode::from(outcome.exit_code() as u8)
        }
        Err(DriverError::Aborted(abort)) => {
            log::info!("{abort}");
            println!("s cnf UNSAT");
            ExitCode::from(20)
        }
        Err(DriverError::Solver(err)) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::from(0)
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome, DriverError> {
    let text = fs::read_to_string(&cli.input)
        .map_err(|e| SolverError::InvalidInput(format!("cannot read {}: {e}", cli.input.display())))?;
    let instance = qdimacs::parse(&text)?;

    if instance.hypergraph.num_vars() == 0 {
        return Ok(Outcome::Sat);
    }
    if instance.hypergraph.clauses.iter().any(|c| c.is_empty()) {
        return Ok(Outcome::Unsat);
    }

    if cli.enumerate && instance.quantifiers.first() != Some(Quantifier::Exists) {
        return Err(SolverError::InvalidOption(
            "--enumerate requires the outermost quantifier block to be existential".into(),
        )
        .into());
    }

    let manager = BddManager::new(1 << 20, 1 << 16);
    let vars = VariableTable::build(&manager, &instance)?;

    let decomposition = pick_best_decomposition(cli, &instance);
    if cli.print_stats {
        eprintln!(
            "decomposition: width={} height={}",
            decomposition.width(),
            decomposition.height()
        );
    }

    let options = ManagerOptions {
        max_global_nsf_size: cli.max_est_nsf_size,
        max_bdd_size: cli.max_bdd_size,
        opt_interval: cli.opt_interval,
        unsat_check_interval: cli.unsat_check_interval,
        sort_before_joining: cli.sort_before_joining,
        dependency_scheme: DependencySchemeKind::from(cli.dependency_scheme),
        disable_cache: cli.disable_cache,
    };

    let comp_manager = ComputationManager::new(options, &instance.hypergraph, instance.quantifiers.len());
    let mut solver = Solver {
        manager: &manager,
        comp_manager,
        hypergraph: &instance.hypergraph,
        quantifier_sequence: instance.quantifiers.clone(),
        vars: &vars,
    };

    let mut root = solver.compute(&decomposition)?;

    let full_cubes = full_cubes(&manager, &instance, &vars);
    let keep_first_level = cli.enumerate && instance.quantifiers.first() == Some(Quantifier::Exists);

    if keep_first_level {
        let mut witness = root.clone();
        witness.set_keep_first_level(true);
        let outcome = solver.finish(&root, &full_cubes)?;
        if outcome == Outcome::Sat {
            print_enumeration(&manager, &instance, &vars, &witness, &full_cubes)?;
        }
        if cli.print_stats {
            eprintln!("global NSF size estimate: {:.1}", solver.comp_manager.global_estimate());
        }
        return Ok(outcome);
    }

    let outcome = solver.finish(&root, &full_cubes)?;
    if cli.print_stats {
        eprintln!("global NSF size estimate: {:.1}", solver.comp_manager.global_estimate());
    }
    Ok(outcome)
}

fn pick_best_decomposition(cli: &Cli, instance: &QbfInstance) -> DecompNode {
    let heuristics = [
        EliminationHeuristic::MinFill,
        EliminationHeuristic::MinDegree,
        EliminationHeuristic::Mcs,
        EliminationHeuristic::Natural,
    ];
    let attempts = (cli.decomposition_iterations as usize).clamp(1, heuristics.len());
    let level_of = |v: u32| instance.hypergraph.level(v);

    let mut best: Option<(f64, DecompNode)> = None;
    for heuristic in heuristics.iter().take(attempts) {
        let candidate = build_decomposition(&instance.hypergraph, *heuristic);
        let score = score_decomposition(cli, &candidate, level_of);
        if best.as_ref().map(|(b, _)| score > *b).unwrap_or(true) {
            best = Some((score, candidate));
        }
    }
    best.expect("at least one heuristic is always attempted").1
}

fn score_decomposition(cli: &Cli, decomp: &DecompNode, level_of: impl Fn(u32) -> usize + Copy) -> f64 {
    use qbf_nsf_solver::cli::FitnessArg;
    match cli.decomposition_fitness {
        FitnessArg::Width => fitness::width(decomp),
        FitnessArg::Height => fitness::height(decomp),
        FitnessArg::JoinCount => fitness::join_count(decomp),
        FitnessArg::JoinBagSize => fitness::join_bag_size(decomp),
        FitnessArg::JoinChildCount => fitness::join_child_count(decomp),
        FitnessArg::JoinBagSizeExp => fitness::join_bag_size_exp(decomp),
        FitnessArg::JoinChildBagSize => fitness::join_child_bag_size(decomp),
        FitnessArg::EstJoinEffort => fitness::est_join_effort(decomp),
        FitnessArg::RemovalImpact => fitness::removal_impact(decomp),
        FitnessArg::RemovalJoinMin => fitness::removal_join_min(decomp),
        FitnessArg::RemovalJoinMax => fitness::removal_join_max(decomp),
        FitnessArg::VariablePosition => fitness::variable_position(decomp, level_of),
        FitnessArg::RemovedLevel => fitness::removed_level(decomp, level_of),
    }
}

fn full_cubes(manager: &BddManager, instance: &QbfInstance, vars: &VariableTable) -> Cubes {
    let mut by_level: std::collections::HashMap<usize, Vec<u32>> = std::collections::HashMap::new();
    for v in instance.hypergraph.vertices() {
        by_level.entry(instance.hypergraph.level(v)).or_default().push(v);
    }
    let mut cubes = Cubes::new();
    for (level, vs) in by_level {
        let mut cube = manager.one();
        for v in vs {
            cube = cube.and(vars.get(v)).expect("conjunction of variable literals cannot exhaust BDD resources here");
        }
        cubes.set(level, cube);
    }
    cubes
}

fn print_enumeration(
    manager: &BddManager,
    instance: &QbfInstance,
    vars: &VariableTable,
    witness: &ManagedComputation,
    cubes: &Cubes,
) -> Result<(), DriverError> {
    let function = witness.evaluate(manager, cubes)?;
    let mut outer_vars: Vec<u32> = instance
        .hypergraph
        .vertices()
        .filter(|&v| instance.hypergraph.level(v) == 1)
        .collect();
    outer_vars.sort_unstable();

    for assignment in 0u64..(1u64 << outer_vars.len()) {
        let mut point = manager.one();
        for (i, &v) in outer_vars.iter().enumerate() {
            let positive = (assignment >> i) & 1 == 1;
            let literal = if positive {
                vars.get(v).clone()
            } else {
                vars.get(v).not()?
            };
            point = point.and(&literal)?;
        }
        let restricted = function.and(&point)?;
        if !restricted.is_false(manager) {
            let literals: Vec<String> = outer_vars
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let positive = (assignment >> i) & 1 == 1;
                    if positive {
                        v.to_string()
                    } else {
                        format!("-{v}")
                    }
                })
                .collect();
            println!("v {} 0", literals.join(" "));
        }
    }
    Ok(())
}
