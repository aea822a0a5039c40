mod common;

use test_log::test;

use cegar_rs::cegar::{Cegar, Verdict};
use cegar_rs::cfa::NodeId;
use cegar_rs::config::{AbstractionStrategy, Config, SearchOrder};
use cegar_rs::predicate::PredicateScope;
use cegar_rs::smt::Prover;
use cegar_rs::Error;

const STRATEGIES: [AbstractionStrategy; 3] = [
    AbstractionStrategy::Boolean,
    AbstractionStrategy::Cartesian,
    AbstractionStrategy::CartesianSession,
];

fn verify(cfa: &cegar_rs::cfa::Cfa, config: Config) -> cegar_rs::Result<Verdict> {
    Cegar::new(cfa, config)?.run()
}

#[test]
fn test_constant_is_safe_after_one_refinement() {
    let cfa = common::constant();
    for strategy in STRATEGIES {
        let mut cegar = Cegar::new(&cfa, Config::default().with_strategy(strategy)).unwrap();
        assert_eq!(cegar.run().unwrap(), Verdict::Safe, "{:?}", strategy);
        let stats = &cegar.context().stats;
        assert_eq!(stats.refinements, 1);
        assert_eq!(stats.counterexample_checks, 1);
        assert!(stats.states_removed >= 1);
        assert!(cegar.context().registry.len() >= 1);
    }
}

#[test]
fn test_counter_is_unsafe() {
    let p = common::counter();
    for strategy in STRATEGIES {
        let verdict = verify(&p.cfa, Config::default().with_strategy(strategy)).unwrap();
        match verdict {
            Verdict::Unsafe {
                locations,
                edges,
                info,
            } => {
                assert_eq!(edges, p.edges);
                assert_eq!(locations.len(), 4);
                assert_eq!(locations[0], NodeId(0));
                assert_eq!(locations.last(), Some(&p.error));
                let info = info.unwrap();
                assert!(!info.spurious);
                assert_eq!(info.path_formula.len(), 3);
            }
            Verdict::Safe => panic!("{:?} missed the bug", strategy),
        }
    }
}

#[test]
fn test_parity_conflict_is_safe() {
    let cfa = common::parity();
    for strategy in STRATEGIES {
        let mut cegar = Cegar::new(&cfa, Config::default().with_strategy(strategy)).unwrap();
        assert_eq!(cegar.run().unwrap(), Verdict::Safe, "{:?}", strategy);
        assert_eq!(cegar.context().stats.refinements, 1);
    }
}

#[test]
fn test_shortest_trace_is_safe() {
    let cfa = common::constant();
    let config = Config::default().with_shortest_trace(true);
    assert_eq!(verify(&cfa, config).unwrap(), Verdict::Safe);
}

#[test]
fn test_no_refinement_reports_first_error_path() {
    let cfa = common::constant();
    let mut cegar = Cegar::new(&cfa, Config::default().with_no_refinement(true)).unwrap();
    match cegar.run().unwrap() {
        Verdict::Unsafe { edges, info, .. } => {
            assert_eq!(edges.len(), 2);
            assert!(info.is_none());
        }
        Verdict::Safe => panic!("expected a spurious bug"),
    }
    assert_eq!(cegar.context().stats.counterexample_checks, 0);
    assert_eq!(cegar.context().itp_prover.queries(), 0);
}

#[test]
fn test_function_call_is_safe() {
    let cfa = common::increment(false);
    for strategy in STRATEGIES {
        let verdict = verify(&cfa, Config::default().with_strategy(strategy)).unwrap();
        assert_eq!(verdict, Verdict::Safe, "{:?}", strategy);
    }
}

#[test]
fn test_function_call_bug_is_found() {
    let cfa = common::increment(true);
    let verdict = verify(&cfa, Config::default()).unwrap();
    match verdict {
        Verdict::Unsafe { edges, .. } => assert_eq!(edges.len(), 5),
        Verdict::Safe => panic!("missed the bug"),
    }
}

#[test]
fn test_function_call_with_local_interpolants() {
    let cfa = common::increment(false);
    let config = Config::default().with_cut_from_beginning(false);
    assert_eq!(verify(&cfa, config).unwrap(), Verdict::Safe);
}

#[test]
fn test_loop_invariant_is_discovered() {
    let cfa = common::lockstep();
    for strategy in STRATEGIES {
        for order in [SearchOrder::Dfs, SearchOrder::Bfs] {
            let config = Config::default().with_strategy(strategy).with_search_order(order);
            let mut cegar = Cegar::new(&cfa, config).unwrap();
            assert_eq!(cegar.run().unwrap(), Verdict::Safe, "{:?} {:?}", strategy, order);
            assert!(cegar.context().stats.states_covered >= 1);
        }
    }
}

#[test]
fn test_predicate_scopes_agree() {
    for scope in [PredicateScope::Location, PredicateScope::Function] {
        let config = Config::default().with_predicate_scope(scope);
        assert_eq!(verify(&common::constant(), config.clone()).unwrap(), Verdict::Safe);
        assert_eq!(verify(&common::lockstep(), config).unwrap(), Verdict::Safe);
    }
}

#[test]
fn test_global_predicates() {
    let config = Config::default().with_global_predicates(true);
    assert_eq!(verify(&common::lockstep(), config).unwrap(), Verdict::Safe);
}

#[test]
fn test_refinement_limit() {
    let cfa = common::constant();
    let err = verify(&cfa, Config::default().with_max_refinements(Some(0))).unwrap_err();
    assert!(matches!(err, Error::RefinementLimit(0)));
    assert_eq!(
        verify(&cfa, Config::default().with_max_refinements(Some(1))).unwrap(),
        Verdict::Safe
    );
}

#[test]
fn test_recursion_is_rejected() {
    let cfa = common::recursive();
    let err = verify(&cfa, Config::default()).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn test_counterexample_dump() {
    let p = common::counter();
    let path = std::env::temp_dir().join(format!("cegar-rs-dump-{}.smt2", std::process::id()));
    let config = Config::default().with_dump_path(Some(path.clone()));
    match verify(&p.cfa, config).unwrap() {
        Verdict::Unsafe { info, .. } => {
            assert_eq!(info.and_then(|i| i.dump), Some(path.clone()));
        }
        Verdict::Safe => panic!("missed the bug"),
    }
    let script = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(script.starts_with("(set-logic QF_LIA)"));
    assert!(script.contains("(declare-fun |main::x@2| () Int)"));
    assert_eq!(script.matches("(assert ").count(), 3);
    assert!(script.ends_with("(check-sat)\n"));
}

#[test]
fn test_dump_failure_is_reported() {
    let p = common::counter();
    let path = std::env::temp_dir()
        .join("cegar-rs-missing-dir")
        .join("nested")
        .join("trace.smt2");
    let err = verify(&p.cfa, Config::default().with_dump_path(Some(path))).unwrap_err();
    assert!(matches!(err, Error::Dump { .. }));
}
