use std::path::PathBuf;

use crate::predicate::PredicateScope;

/// Abstract-post computation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AbstractionStrategy {
    /// Exact image via All-SMT over the predicates.
    Boolean,
    /// One cube, classifying each predicate separately.
    #[default]
    Cartesian,
    /// Cartesian, on a dedicated prover session restarted every
    /// [`Config::session_restart_threshold`] queries.
    CartesianSession,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SearchOrder {
    #[default]
    Dfs,
    Bfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SolverBackend {
    /// In-process linear arithmetic prover.
    #[default]
    Linear,
    /// External SMT-LIB2 process.
    SmtLib { command: String, args: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: AbstractionStrategy,
    pub solver: SolverBackend,
    pub use_cartesian_cache: bool,
    pub use_feasibility_cache: bool,
    /// Queries per prover session; `0` never restarts.
    pub session_restart_threshold: usize,
    /// Stop building the path formula at the first infeasible assume.
    pub shortest_trace: bool,
    /// Always interpolate from the first block instead of the innermost
    /// open call.
    pub cut_from_beginning: bool,
    /// Attach every new predicate to every trace state.
    pub global_predicates: bool,
    pub split_equalities: bool,
    /// Report reaching an error location as a bug without checking the path.
    pub no_refinement: bool,
    pub predicate_scope: PredicateScope,
    pub search_order: SearchOrder,
    pub max_refinements: Option<usize>,
    /// Where to write the path formula of a confirmed bug.
    pub dump_path: Option<PathBuf>,
    /// Node table and computed cache size, as a power of two.
    pub bdd_bits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: AbstractionStrategy::default(),
            solver: SolverBackend::default(),
            use_cartesian_cache: true,
            use_feasibility_cache: true,
            session_restart_threshold: 1000,
            shortest_trace: false,
            cut_from_beginning: true,
            global_predicates: false,
            split_equalities: false,
            no_refinement: false,
            predicate_scope: PredicateScope::default(),
            search_order: SearchOrder::default(),
            max_refinements: None,
            dump_path: None,
            bdd_bits: 16,
        }
    }
}

impl Config {
    pub fn with_strategy(mut self, strategy: AbstractionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_solver(mut self, solver: SolverBackend) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_caches(mut self, cartesian: bool, feasibility: bool) -> Self {
        self.use_cartesian_cache = cartesian;
        self.use_feasibility_cache = feasibility;
        self
    }

    pub fn with_session_restart_threshold(mut self, threshold: usize) -> Self {
        self.session_restart_threshold = threshold;
        self
    }

    pub fn with_shortest_trace(mut self, enabled: bool) -> Self {
        self.shortest_trace = enabled;
        self
    }

    pub fn with_cut_from_beginning(mut self, enabled: bool) -> Self {
        self.cut_from_beginning = enabled;
        self
    }

    pub fn with_global_predicates(mut self, enabled: bool) -> Self {
        self.global_predicates = enabled;
        self
    }

    pub fn with_split_equalities(mut self, enabled: bool) -> Self {
        self.split_equalities = enabled;
        self
    }

    pub fn with_no_refinement(mut self, enabled: bool) -> Self {
        self.no_refinement = enabled;
        self
    }

    pub fn with_predicate_scope(mut self, scope: PredicateScope) -> Self {
        self.predicate_scope = scope;
        self
    }

    pub fn with_search_order(mut self, order: SearchOrder) -> Self {
        self.search_order = order;
        self
    }

    pub fn with_max_refinements(mut self, limit: Option<usize>) -> Self {
        self.max_refinements = limit;
        self
    }

    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.dump_path = path;
        self
    }
}
