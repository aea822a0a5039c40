//! The CEGAR loop.

use std::collections::VecDeque;

use log::{debug, info};

use crate::abstraction::{AbstractionManager, CounterexampleTraceInfo};
use crate::art::{Art, StateId};
use crate::cfa::{Cfa, EdgeId, NodeId};
use crate::config::{Config, SearchOrder};
use crate::context::Context;
use crate::domain::{AbstractDomain, AbstractState};
use crate::error::Result;
use crate::transfer::{Successor, TransferRelation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No error location is reachable.
    Safe,
    Unsafe {
        /// Locations from the program entry to the error location.
        locations: Vec<NodeId>,
        edges: Vec<EdgeId>,
        /// Feasibility check of the path; absent without refinement.
        info: Option<CounterexampleTraceInfo>,
    },
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

pub struct Cegar<'a> {
    cfa: &'a Cfa,
    ctx: Context,
    transfer: TransferRelation,
    domain: AbstractDomain,
    art: Art,
    worklist: VecDeque<StateId>,
}

impl<'a> Cegar<'a> {
    pub fn new(cfa: &'a Cfa, config: Config) -> Result<Self> {
        Ok(Self::with_context(cfa, Context::new(config)?))
    }

    pub fn with_context(cfa: &'a Cfa, mut ctx: Context) -> Self {
        let transfer = TransferRelation::new(AbstractionManager::new(ctx.config.strategy));
        let domain = AbstractDomain;
        let top = domain.top(&ctx.bdd);
        let art = Art::new(AbstractState::root(cfa.entry(), top));
        ctx.stats.states_created += 1;
        let mut worklist = VecDeque::new();
        worklist.push_back(art.root());
        Self {
            cfa,
            ctx,
            transfer,
            domain,
            art,
            worklist,
        }
    }

    pub fn cfa(&self) -> &'a Cfa {
        self.cfa
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn art(&self) -> &Art {
        &self.art
    }

    fn next(&mut self) -> Option<StateId> {
        match self.ctx.config.search_order {
            SearchOrder::Dfs => self.worklist.pop_back(),
            SearchOrder::Bfs => self.worklist.pop_front(),
        }
    }

    /// Explore until the worklist is empty or a feasible error path is found.
    pub fn run(&mut self) -> Result<Verdict> {
        info!(
            "Starting analysis with {:?} abstraction, {} CFA nodes",
            self.transfer.abstraction().strategy(),
            self.cfa.num_nodes()
        );
        let verdict = self.explore();
        self.ctx.log_stats();
        let verdict = verdict?;
        info!("Verdict: {}", if verdict.is_safe() { "SAFE" } else { "UNSAFE" });
        Ok(verdict)
    }

    fn explore(&mut self) -> Result<Verdict> {
        'worklist: while let Some(id) = self.next() {
            if !self.art.is_live(id) || self.art.get(id).covered {
                continue;
            }
            let location = self.art.get(id).location;
            debug!("Expanding {} at {}", id, location);
            let edges = self.cfa.node(location).leaving.clone();
            for edge in edges {
                let successor =
                    self.transfer
                        .get_abstract_successor(&mut self.ctx, self.cfa, &self.art, id, edge)?;
                match successor {
                    Successor::Bottom => {}
                    Successor::Successor(state) => {
                        let child = self.art.add_child(state);
                        self.ctx.stats.states_created += 1;
                        match self.domain.stop(&self.ctx.bdd, &self.art, child) {
                            Some(coverer) => {
                                debug!("{} is covered by {}", child, coverer);
                                self.art.cover(child, coverer);
                                self.ctx.stats.states_covered += 1;
                            }
                            None => self.worklist.push_back(child),
                        }
                    }
                    Successor::ErrorConfirmed { edges, info } => {
                        let mut locations = vec![self.cfa.entry()];
                        locations.extend(edges.iter().map(|&e| self.cfa.edge(e).target));
                        return Ok(Verdict::Unsafe {
                            locations,
                            edges,
                            info,
                        });
                    }
                    Successor::RefinementNeeded { unreach, readd } => {
                        let removal = self.art.remove(&unreach);
                        self.ctx.stats.states_removed += removal.removed.len();
                        let art = &self.art;
                        self.worklist.retain(|&s| art.is_live(s));
                        for s in removal.uncovered.into_iter().chain(readd) {
                            if !self.worklist.contains(&s) {
                                self.worklist.push_back(s);
                            }
                        }
                        continue 'worklist;
                    }
                }
            }
        }
        Ok(Verdict::Safe)
    }
}
