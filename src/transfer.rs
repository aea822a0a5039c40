//! Successor computation and refinement.

use log::{debug, info};

use crate::abstraction::{AbstractionManager, CounterexampleTraceInfo};
use crate::art::{Art, StateId};
use crate::cfa::{Cfa, EdgeId, EdgeKind, NodeId};
use crate::context::Context;
use crate::domain::{AbstractState, CallFrame};
use crate::error::{Error, Result};
use crate::reference::Ref;

#[derive(Debug)]
pub enum Successor {
    Bottom,
    Successor(AbstractState),
    /// An error location is reachable along `edges` from the root.
    ErrorConfirmed {
        edges: Vec<EdgeId>,
        info: Option<CounterexampleTraceInfo>,
    },
    /// A spurious counterexample was refined away. The driver drops `unreach`
    /// from the tree and explores `readd` again.
    RefinementNeeded {
        unreach: Vec<StateId>,
        readd: Vec<StateId>,
    },
}

#[derive(Debug, Clone)]
pub struct TransferRelation {
    abstraction: AbstractionManager,
}

impl TransferRelation {
    pub fn new(abstraction: AbstractionManager) -> Self {
        Self { abstraction }
    }

    pub fn abstraction(&self) -> &AbstractionManager {
        &self.abstraction
    }

    pub fn get_abstract_successor(
        &self,
        ctx: &mut Context,
        cfa: &Cfa,
        art: &Art,
        id: StateId,
        edge: EdgeId,
    ) -> Result<Successor> {
        let state = art.get(id);
        if !cfa.node(state.location).leaving.contains(&edge) {
            return Ok(Successor::Bottom);
        }
        let e = cfa.edge(edge);

        let mut stack = state.stack.clone();
        let mut region = state.region;
        match &e.kind {
            EdgeKind::FunctionCall {
                callee,
                return_site,
                ..
            } => {
                let active = std::iter::once(state.location)
                    .chain(stack.iter().map(|f| f.return_site))
                    .any(|n| cfa.node(n).function == *callee);
                if active {
                    return Err(Error::Unsupported(format!(
                        "recursive call of {} at {}",
                        callee, state.location
                    )));
                }
                stack.push(CallFrame {
                    region: state.region,
                    return_site: *return_site,
                });
            }
            EdgeKind::Return { .. } => match stack.pop() {
                Some(frame) if frame.return_site == e.target => {
                    let caller = &cfa.node(e.target).function;
                    region = return_region(ctx, caller, state.region, frame.region);
                }
                _ => return Ok(Successor::Bottom),
            },
            _ => {}
        }

        let predicates = ctx.predicates.predicates(cfa.node(e.target));
        let region = self
            .abstraction
            .build_abstraction(ctx, cfa, region, e.target, edge, &predicates)?;
        if ctx.bdd.is_zero(region) {
            return Ok(Successor::Bottom);
        }

        let successor = AbstractState {
            location: e.target,
            region,
            stack,
            parent: Some(id),
            edge: Some(edge),
            covered: false,
        };
        if !cfa.is_error(e.target) {
            return Ok(Successor::Successor(successor));
        }

        let mut edges = art.edges_to(id);
        edges.push(edge);
        info!("Error location {} reached by a path of {} edges", e.target, edges.len());
        if ctx.config.no_refinement {
            return Ok(Successor::ErrorConfirmed { edges, info: None });
        }

        let trace_info = self
            .abstraction
            .build_counterexample_trace(ctx, cfa, &edges)?;
        if !trace_info.spurious {
            return Ok(Successor::ErrorConfirmed {
                edges,
                info: Some(trace_info),
            });
        }

        // Trace states are the tree path to `id` followed by the error state.
        let path = art.path_to(id);
        let locations: Vec<NodeId> = path
            .iter()
            .map(|&s| art.get(s).location)
            .chain(std::iter::once(e.target))
            .collect();
        self.refine(ctx, cfa, art, &path, &locations, trace_info)
    }

    /// Add the new predicates along the trace and pick the subtree to
    /// re-explore. `locations` has one entry per trace state, `path` one per
    /// trace state except the final error state.
    fn refine(
        &self,
        ctx: &mut Context,
        cfa: &Cfa,
        art: &Art,
        path: &[StateId],
        locations: &[NodeId],
        trace_info: CounterexampleTraceInfo,
    ) -> Result<Successor> {
        ctx.stats.refinements += 1;
        if let Some(limit) = ctx.config.max_refinements {
            if ctx.stats.refinements > limit {
                return Err(Error::RefinementLimit(limit));
            }
        }

        let mut first_growth = None;
        for (i, (predicates, &location)) in trace_info.predicates.into_iter().zip(locations).enumerate() {
            if predicates.is_empty() {
                continue;
            }
            let grew = ctx.predicates.update(cfa.node(location), predicates);
            if grew && first_growth.is_none() {
                first_growth = Some(i);
            }
        }

        let root = match first_growth {
            None => {
                let location = locations.last().map_or(0, |n| n.0);
                return Err(Error::PrecisionInsufficient { location });
            }
            Some(0) => path[0],
            Some(i) => path[i - 1],
        };
        info!(
            "Refinement #{}: re-exploring from {} at {}, {} predicates in total",
            ctx.stats.refinements,
            root,
            art.get(root).location,
            ctx.predicates.size()
        );
        Ok(Successor::RefinementNeeded {
            unreach: art.subtree(root, false),
            readd: vec![root],
        })
    }
}

/// Region entering the return site: the callee's exit region together with
/// the caller-local facts of the region saved at the call.
fn return_region(ctx: &Context, caller: &str, exit: Ref, saved: Ref) -> Ref {
    let registry = &ctx.registry;
    let kept = ctx.bdd.exists(saved, |v| match registry.get(v) {
        Some(p) => !p.is_local_to(caller),
        None => true,
    });
    debug!("return_region(exit = {}, saved = {}) -> kept {}", exit, saved, kept);
    ctx.bdd.apply_and(exit, kept)
}
