//! Run the CEGAR engine on one of the built-in sample programs.
//!
//! Run with:
//! ```bash
//! cargo run --example cegar -- lockstep --strategy boolean --dot art.dot
//! ```

use std::path::PathBuf;

use cegar_rs::cegar::{Cegar, Verdict};
use cegar_rs::cfa::{Cfa, CfaBuilder};
use cegar_rs::config::{AbstractionStrategy, Config, SearchOrder, SolverBackend};
use cegar_rs::expr::{Formula, Term};
use cegar_rs::predicate::PredicateScope;
use clap::{Parser, ValueEnum};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Program {
    /// x = 0; if (x > 0) error;
    Constant,
    /// x = 0; x = x + 1; if (x == 1) error;
    Counter,
    /// x = 5; r = inc(x); if (r != 6) error;
    Increment,
    /// x = 0; y = 0; while (*) { x++; y++; } if (x != y) error;
    Lockstep,
    /// n = *; i = 0; s = 0; while (i < n) { i++; s += 2; } if (n >= 0 && s != 2 * i) error;
    Doubling,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Strategy {
    Boolean,
    Cartesian,
    Session,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Predicate abstraction with interpolation-based refinement")]
struct Cli {
    /// Sample program to verify
    #[arg(value_enum, default_value = "lockstep")]
    program: Program,

    /// Abstract post computation
    #[arg(long, value_enum, default_value = "cartesian")]
    strategy: Strategy,

    /// Explore the ART breadth-first
    #[arg(long)]
    bfs: bool,

    /// Track predicates per function instead of per location
    #[arg(long)]
    function_scope: bool,

    /// Attach new predicates to every location of the trace
    #[arg(long)]
    global_predicates: bool,

    /// Report the first abstract error path without checking it
    #[arg(long)]
    no_refinement: bool,

    /// Give up after this many refinements
    #[arg(long)]
    max_refinements: Option<usize>,

    /// External SMT-LIB2 solver command, e.g. `mathsat`
    #[arg(long)]
    solver: Option<String>,

    /// Arguments passed to the external solver
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    solver_args: Vec<String>,

    /// Write the path formula of a real bug here
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Write the final ART in DOT format here
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Log solver queries and abstraction results
    #[arg(short, long)]
    verbose: bool,
}

fn var(name: &str) -> Term {
    Term::var(format!("main::{}", name))
}

fn build(program: Program) -> Cfa {
    let mut b = CfaBuilder::new();
    let main = b.function("main");
    match program {
        Program::Constant => {
            let l1 = b.node("main");
            let err = b.error_node("main");
            b.assign(main.entry, l1, "main::x", Term::int(0));
            b.assume(l1, err, Formula::gt(var("x"), Term::int(0)));
            b.assume(l1, main.exit, Formula::le(var("x"), Term::int(0)));
        }
        Program::Counter => {
            let l1 = b.node("main");
            let l2 = b.node("main");
            let err = b.error_node("main");
            b.assign(main.entry, l1, "main::x", Term::int(0));
            b.assign(l1, l2, "main::x", var("x").add(Term::int(1)));
            b.assume(l2, err, Formula::eq(var("x"), Term::int(1)));
            b.assume(l2, main.exit, Formula::ne(var("x"), Term::int(1)));
        }
        Program::Increment => {
            let inc = b.function("inc");
            let l1 = b.node("main");
            let l2 = b.node("main");
            let err = b.error_node("main");
            b.return_value(inc.entry, "inc", Term::var("inc::a").add(Term::int(1)));
            b.assign(main.entry, l1, "main::x", Term::int(5));
            b.call(l1, l2, "inc", vec![("inc::a".to_string(), var("x"))], Some("main::r"));
            b.assume(l2, err, Formula::ne(var("r"), Term::int(6)));
            b.assume(l2, main.exit, Formula::eq(var("r"), Term::int(6)));
        }
        Program::Lockstep => {
            let l1 = b.node("main");
            let head = b.node("main");
            let body = b.node("main");
            let mid = b.node("main");
            let check = b.node("main");
            let err = b.error_node("main");
            b.assign(main.entry, l1, "main::x", Term::int(0));
            b.assign(l1, head, "main::y", Term::int(0));
            b.blank(head, body);
            b.assign(body, mid, "main::x", var("x").add(Term::int(1)));
            b.assign(mid, head, "main::y", var("y").add(Term::int(1)));
            b.blank(head, check);
            b.assume(check, err, Formula::ne(var("x"), var("y")));
            b.assume(check, main.exit, Formula::eq(var("x"), var("y")));
        }
        Program::Doubling => {
            let l1 = b.node("main");
            let l2 = b.node("main");
            let head = b.node("main");
            let body = b.node("main");
            let check = b.node("main");
            let bad = b.node("main");
            let err = b.error_node("main");
            b.havoc(main.entry, l1, "main::n");
            b.assign(l1, l2, "main::i", Term::int(0));
            b.assign(l2, head, "main::s", Term::int(0));
            b.assume(head, body, Formula::lt(var("i"), var("n")));
            b.assign(body, check, "main::i", var("i").add(Term::int(1)));
            b.assign(check, head, "main::s", var("s").add(Term::int(2)));
            b.assume(head, bad, Formula::ge(var("i"), var("n")));
            b.assume(
                bad,
                err,
                Formula::and([
                    Formula::ge(var("n"), Term::int(0)),
                    Formula::ne(var("s"), Term::int(2).mul(var("i"))),
                ]),
            );
        }
    }
    b.build("main")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let strategy = match cli.strategy {
        Strategy::Boolean => AbstractionStrategy::Boolean,
        Strategy::Cartesian => AbstractionStrategy::Cartesian,
        Strategy::Session => AbstractionStrategy::CartesianSession,
    };
    let solver = match cli.solver {
        Some(command) => SolverBackend::SmtLib {
            command,
            args: cli.solver_args,
        },
        None => SolverBackend::Linear,
    };
    let config = Config::default()
        .with_strategy(strategy)
        .with_solver(solver)
        .with_search_order(if cli.bfs { SearchOrder::Bfs } else { SearchOrder::Dfs })
        .with_predicate_scope(if cli.function_scope {
            PredicateScope::Function
        } else {
            PredicateScope::Location
        })
        .with_global_predicates(cli.global_predicates)
        .with_no_refinement(cli.no_refinement)
        .with_max_refinements(cli.max_refinements)
        .with_dump_path(cli.dump);

    let cfa = build(cli.program);
    println!("program = {:?}, {} nodes", cli.program, cfa.num_nodes());

    let time_total = std::time::Instant::now();
    let mut cegar = Cegar::new(&cfa, config)?;
    let verdict = cegar.run()?;
    match &verdict {
        Verdict::Safe => println!("SAFE"),
        Verdict::Unsafe {
            locations,
            edges,
            info,
        } => {
            println!("UNSAFE");
            for (location, edge) in locations.iter().skip(1).zip(edges) {
                println!("  {} --[{}]--> {}", cfa.edge(*edge).source, cfa.edge(*edge).kind, location);
            }
            if let Some(path) = info.as_ref().and_then(|i| i.dump.as_ref()) {
                println!("path formula written to {}", path.display());
            }
        }
    }
    println!(
        "{} states, {} refinements, {} predicates",
        cegar.art().len(),
        cegar.context().stats.refinements,
        cegar.context().registry.len()
    );

    if let Some(path) = cli.dot {
        std::fs::write(&path, cegar.to_dot()?)?;
        println!("ART written to {}", path.display());
    }

    println!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
