//! Abstract post computation and counterexample analysis.
//!
//! [`AbstractionManager::build_abstraction`] computes the predicate
//! abstraction of the strongest post of a region along one CFA edge, either
//! exactly (Boolean abstraction, by All-SMT over the predicates) or as a
//! single cube (Cartesian abstraction, one implication check per predicate).
//!
//! [`AbstractionManager::build_counterexample_trace`] decides whether a path
//! to an error location is feasible and, if it is not, derives new predicates
//! from the interpolants of its prefixes.

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{debug, info};

use crate::cfa::{Cfa, EdgeId, EdgeKind, NodeId};
use crate::config::AbstractionStrategy;
use crate::context::{Context, Truth};
use crate::error::{Error, Result};
use crate::expr::{CmpOp, Formula};
use crate::pathformula::{edge_formula, SsaMap};
use crate::predicate::{Predicate, PredicateRegistry};
use crate::reference::Ref;
use crate::smt::{AllSatResult, Prover};
use crate::smt::smtlib;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterexampleTraceInfo {
    pub spurious: bool,
    /// New predicates of every trace state, root first. Empty unless spurious.
    pub predicates: Vec<Vec<Predicate>>,
    /// Path formula blocks of a feasible trace.
    pub path_formula: Vec<Formula>,
    /// File the path formula of a feasible trace was written to.
    pub dump: Option<PathBuf>,
}

impl CounterexampleTraceInfo {
    pub fn has_new_predicates(&self) -> bool {
        self.predicates.iter().any(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct AbstractionManager {
    strategy: AbstractionStrategy,
}

impl AbstractionManager {
    pub fn new(strategy: AbstractionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> AbstractionStrategy {
        self.strategy
    }

    /// Abstraction of the post of `region` along `edge`, over `predicates`
    /// (the predicates of `successor`).
    pub fn build_abstraction(
        &self,
        ctx: &mut Context,
        cfa: &Cfa,
        region: Ref,
        successor: NodeId,
        edge: EdgeId,
        predicates: &[Predicate],
    ) -> Result<Ref> {
        ctx.stats.abstractions += 1;
        let kind = &cfa.edge(edge).kind;
        if kind.is_trivial() || (predicates.is_empty() && ctx.bdd.is_one(region)) {
            ctx.stats.abstraction_shortcuts += 1;
            return Ok(region);
        }
        debug!(
            "build_abstraction(region = {}, edge = {} [{}], successor = {}, {} predicates)",
            region,
            edge,
            kind,
            successor,
            predicates.len()
        );
        let res = match self.strategy {
            AbstractionStrategy::Boolean => self.boolean_abstraction(ctx, region, kind, predicates)?,
            AbstractionStrategy::Cartesian | AbstractionStrategy::CartesianSession => {
                self.cartesian_abstraction(ctx, region, edge, kind, predicates)?
            }
        };
        debug!("build_abstraction -> {}", ctx.bdd.to_bracket_string(res));
        Ok(res)
    }

    fn boolean_abstraction(
        &self,
        ctx: &mut Context,
        region: Ref,
        kind: &EdgeKind,
        predicates: &[Predicate],
    ) -> Result<Ref> {
        let mut ssa = SsaMap::new();
        let pre = ssa.instantiate(&ctx.registry.region_to_formula(&ctx.bdd, region));
        let transition = edge_formula(kind, &mut ssa);
        let atoms: Vec<Formula> = predicates
            .iter()
            .map(|p| ssa.instantiate(p.formula()))
            .collect();

        let prover = &mut ctx.prover;
        if pre.needs_uf() || transition.needs_uf() || atoms.iter().any(Formula::needs_uf) {
            prover.set_uf(true);
        }
        prover.push()?;
        prover.assert_formula(&pre)?;
        prover.assert_formula(&transition)?;
        let mut models = Vec::new();
        let res = prover.all_sat(&atoms, &mut |m| models.push(m.to_vec()));
        prover.pop()?;

        let bdd = &ctx.bdd;
        Ok(match res? {
            AllSatResult::Trivial => bdd.one(),
            AllSatResult::Models(_) => bdd.apply_or_many(models.iter().map(|m| {
                bdd.cube(
                    predicates
                        .iter()
                        .zip(m)
                        .map(|(p, &v)| if v { p.var() as i32 } else { -(p.var() as i32) }),
                )
            })),
        })
    }

    fn cartesian_abstraction(
        &self,
        ctx: &mut Context,
        region: Ref,
        edge: EdgeId,
        kind: &EdgeKind,
        predicates: &[Predicate],
    ) -> Result<Ref> {
        let Context {
            config,
            bdd,
            registry,
            prover,
            session,
            caches,
            stats,
            ..
        } = ctx;
        let prover: &mut dyn Prover = match (self.strategy, session) {
            (AbstractionStrategy::CartesianSession, Some(s)) => s,
            (AbstractionStrategy::CartesianSession, None) => {
                return Err(Error::Unsupported(
                    "session abstraction without a prover session".to_string(),
                ))
            }
            _ => &mut **prover,
        };

        let mut ssa = SsaMap::new();
        let pre = ssa.instantiate(&registry.region_to_formula(bdd, region));
        let transition = edge_formula(kind, &mut ssa);

        if pre.needs_uf()
            || transition.needs_uf()
            || predicates.iter().any(|p| p.formula().needs_uf())
        {
            prover.set_uf(true);
        }
        prover.push()?;
        prover.assert_formula(&pre)?;
        prover.assert_formula(&transition)?;

        let cached = if config.use_feasibility_cache {
            caches.feasibility.get(&(region, edge)).copied()
        } else {
            None
        };
        let feasible = match cached {
            Some(f) => {
                stats.feasibility_cache_hits += 1;
                f
            }
            None => {
                let f = prover.check_sat()?;
                if config.use_feasibility_cache {
                    caches.feasibility.insert((region, edge), f);
                }
                f
            }
        };
        if !feasible {
            prover.pop()?;
            return Ok(bdd.zero());
        }

        let mut literals = Vec::new();
        for p in predicates {
            let key = (region, edge, p.var());
            let cached = if config.use_cartesian_cache {
                caches.cartesian.get(&key).copied()
            } else {
                None
            };
            let truth = match cached {
                Some(t) => {
                    stats.cartesian_cache_hits += 1;
                    t
                }
                None => {
                    let t = classify(prover, &ssa.instantiate(p.formula()))?;
                    if config.use_cartesian_cache {
                        caches.cartesian.insert(key, t);
                    }
                    t
                }
            };
            match truth {
                Truth::True => literals.push(p.var() as i32),
                Truth::False => literals.push(-(p.var() as i32)),
                Truth::DontCare => {}
            }
        }
        prover.pop()?;
        Ok(bdd.cube(literals))
    }

    /// Check the path along `edges` from the program entry and derive
    /// predicates for its states if it is infeasible.
    pub fn build_counterexample_trace(
        &self,
        ctx: &mut Context,
        cfa: &Cfa,
        edges: &[EdgeId],
    ) -> Result<CounterexampleTraceInfo> {
        ctx.stats.counterexample_checks += 1;
        let config = &ctx.config;
        let kinds: Vec<&EdgeKind> = edges.iter().map(|&e| &cfa.edge(e).kind).collect();

        let mut ssa = SsaMap::new();
        let blocks: Vec<Formula> = kinds.iter().map(|k| edge_formula(k, &mut ssa)).collect();

        let prover = &mut ctx.itp_prover;
        prover.reset()?;
        prover.set_uf(blocks.iter().any(|b| b.needs_uf()));

        let mut groups = Vec::with_capacity(blocks.len());
        let mut infeasible = false;
        for (block, kind) in blocks.iter().zip(&kinds) {
            let group = prover.new_itp_group()?;
            prover.set_itp_group(group)?;
            prover.assert_formula(block)?;
            groups.push(group);
            if config.shortest_trace && matches!(kind, EdgeKind::Assume(_)) && !prover.check_sat()? {
                infeasible = true;
                break;
            }
        }
        if !infeasible {
            infeasible = !prover.check_sat()?;
        }

        if !infeasible {
            info!("Path of {} edges is feasible", edges.len());
            let dump = match &config.dump_path {
                Some(path) => {
                    std::fs::write(path, smtlib::script(&blocks)).map_err(|source| {
                        Error::Dump {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    Some(path.clone())
                }
                None => None,
            };
            return Ok(CounterexampleTraceInfo {
                spurious: false,
                predicates: Vec::new(),
                path_formula: blocks,
                dump,
            });
        }

        let mut per_state: Vec<BTreeSet<Predicate>> = vec![BTreeSet::new(); edges.len() + 1];
        let mut broadcast = BTreeSet::new();
        let mut open_calls = Vec::new();
        for k in 1..groups.len() {
            match kinds[k - 1] {
                EdgeKind::FunctionCall { .. } => open_calls.push(k - 1),
                EdgeKind::Return { .. } => {
                    open_calls.pop();
                }
                _ => {}
            }
            let start = if config.cut_from_beginning {
                0
            } else {
                open_calls.last().copied().unwrap_or(0)
            };
            let itp = prover.interpolant(&groups[start..k])?;
            debug!("interpolant of blocks {}..{}: {}", start, k, itp);
            let preds = predicates_from_interpolant(&mut ctx.registry, &itp, config.split_equalities);
            if config.global_predicates {
                broadcast.extend(preds);
            } else {
                per_state[k].extend(preds);
            }
        }
        if config.global_predicates {
            per_state.iter_mut().for_each(|s| s.clone_from(&broadcast));
        }

        Ok(CounterexampleTraceInfo {
            spurious: true,
            predicates: per_state
                .into_iter()
                .map(|s| s.into_iter().collect())
                .collect(),
            path_formula: Vec::new(),
            dump: None,
        })
    }
}

/// Whether the current assertions force `atom` true, false, or neither.
fn classify(prover: &mut dyn Prover, atom: &Formula) -> Result<Truth> {
    prover.push()?;
    prover.assert_formula(&atom.clone().not())?;
    let can_be_false = prover.check_sat()?;
    prover.pop()?;
    if !can_be_false {
        return Ok(Truth::True);
    }
    prover.push()?;
    prover.assert_formula(atom)?;
    let can_be_true = prover.check_sat()?;
    prover.pop()?;
    Ok(if can_be_true {
        Truth::DontCare
    } else {
        Truth::False
    })
}

/// Atoms of an interpolant, moved to SSA index 1.
fn predicates_from_interpolant(
    registry: &mut PredicateRegistry,
    itp: &Formula,
    split_equalities: bool,
) -> Vec<Predicate> {
    let mut atoms = Vec::new();
    for atom in itp.atoms() {
        if atom.vars().is_empty() {
            continue;
        }
        let atom = atom.at_index(1);
        match atom {
            Formula::Cmp(CmpOp::Eq, a, b) if split_equalities => {
                atoms.push(Formula::le(a.clone(), b.clone()));
                atoms.push(Formula::ge(a, b));
            }
            other => atoms.push(other),
        }
    }
    atoms
        .into_iter()
        .map(|f| registry.get_or_create(f))
        .collect()
}
