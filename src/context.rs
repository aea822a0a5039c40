//! Per-run state shared by the analysis components.

use std::collections::HashMap;

use log::info;

use crate::bdd::Bdd;
use crate::cfa::EdgeId;
use crate::config::{AbstractionStrategy, Config, SolverBackend};
use crate::error::Result;
use crate::predicate::{PredicateMap, PredicateRegistry};
use crate::reference::Ref;
use crate::smt::session::ProverFactory;
use crate::smt::{LinearProver, Prover, SessionProver, SmtLibProver};

/// Outcome of classifying one predicate after an edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Truth {
    False,
    DontCare,
    True,
}

#[derive(Debug, Default)]
pub struct AbstractionCaches {
    /// (region, edge) -> is the post satisfiable
    pub feasibility: HashMap<(Ref, EdgeId), bool>,
    /// (region, edge, predicate variable) -> classification
    pub cartesian: HashMap<(Ref, EdgeId, u32), Truth>,
}

#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub states_created: usize,
    pub states_covered: usize,
    pub states_removed: usize,
    pub abstractions: usize,
    pub abstraction_shortcuts: usize,
    pub feasibility_cache_hits: usize,
    pub cartesian_cache_hits: usize,
    pub counterexample_checks: usize,
    pub refinements: usize,
}

pub fn prover_factory(backend: &SolverBackend) -> ProverFactory {
    let backend = backend.clone();
    Box::new(move || -> Result<Box<dyn Prover>> {
        let prover: Box<dyn Prover> = match &backend {
            SolverBackend::Linear => Box::new(LinearProver::new()),
            SolverBackend::SmtLib { command, args } => Box::new(SmtLibProver::new(command, args)?),
        };
        Ok(prover)
    })
}

pub struct Context {
    pub config: Config,
    pub bdd: Bdd,
    pub registry: PredicateRegistry,
    pub predicates: PredicateMap,
    /// Prover for abstraction queries.
    pub prover: Box<dyn Prover>,
    /// Prover for counterexample analysis.
    pub itp_prover: Box<dyn Prover>,
    pub session: Option<SessionProver>,
    pub caches: AbstractionCaches,
    pub stats: Stats,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let mut factory = prover_factory(&config.solver);
        let prover = factory()?;
        let itp_prover = factory()?;
        Self::with_provers(config, prover, itp_prover)
    }

    /// Context using the given provers for abstraction and interpolation.
    pub fn with_provers(
        config: Config,
        prover: Box<dyn Prover>,
        itp_prover: Box<dyn Prover>,
    ) -> Result<Self> {
        let session = match config.strategy {
            AbstractionStrategy::CartesianSession => Some(SessionProver::new(
                prover_factory(&config.solver),
                config.session_restart_threshold,
            )?),
            _ => None,
        };
        Ok(Self {
            bdd: Bdd::new(config.bdd_bits),
            registry: PredicateRegistry::new(),
            predicates: PredicateMap::new(config.predicate_scope),
            prover,
            itp_prover,
            session,
            caches: AbstractionCaches::default(),
            stats: Stats::default(),
            config,
        })
    }

    /// Satisfiability queries issued so far, over all provers.
    pub fn solver_queries(&self) -> usize {
        self.prover.queries()
            + self.itp_prover.queries()
            + self.session.as_ref().map_or(0, |s| s.queries())
    }

    pub fn log_stats(&self) {
        let s = &self.stats;
        let (hits, misses) = self.bdd.cache_stats();
        info!("States created:          {}", s.states_created);
        info!("States covered:          {}", s.states_covered);
        info!("States removed:          {}", s.states_removed);
        info!("Refinements:             {}", s.refinements);
        info!("Counterexample checks:   {}", s.counterexample_checks);
        info!(
            "Abstractions:            {} ({} shortcuts)",
            s.abstractions, s.abstraction_shortcuts
        );
        info!("Feasibility cache hits:  {}", s.feasibility_cache_hits);
        info!("Cartesian cache hits:    {}", s.cartesian_cache_hits);
        info!("Predicates:              {}", self.registry.len());
        info!("Solver queries:          {}", self.solver_queries());
        info!(
            "BDD nodes:               {} (cache: {} hits, {} misses)",
            self.bdd.num_nodes(),
            hits,
            misses
        );
    }
}
