//! SSA-indexed transition formulas of CFA edges.

use std::collections::BTreeMap;

use crate::cfa::{EdgeKind, Statement, RETURN_VAR};
use crate::expr::{Formula, Term, Var};

/// Current SSA index of every variable; unmentioned variables are at index 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsaMap {
    indices: BTreeMap<String, u32>,
}

impl SsaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> u32 {
        self.indices.get(name).copied().unwrap_or(1)
    }

    /// Move `name` to a fresh index and return it.
    pub fn bump(&mut self, name: &str) -> u32 {
        let next = self.get(name) + 1;
        self.indices.insert(name.to_string(), next);
        next
    }

    pub fn instantiate_term(&self, term: &Term) -> Term {
        term.map_vars(&|v| Var::indexed(v.name.clone(), self.get(&v.name)))
    }

    pub fn instantiate(&self, formula: &Formula) -> Formula {
        formula.map_vars(&|v| Var::indexed(v.name.clone(), self.get(&v.name)))
    }
}

/// Formula of one edge, reading the variables at their current indices in
/// `ssa` and advancing `ssa` past the edge's writes.
pub fn edge_formula(kind: &EdgeKind, ssa: &mut SsaMap) -> Formula {
    match kind {
        EdgeKind::Blank | EdgeKind::Declaration(_) => Formula::True,
        EdgeKind::Assume(cond) => ssa.instantiate(cond),
        EdgeKind::Statement(Statement::Assign(var, value)) => {
            let rhs = ssa.instantiate_term(value);
            let index = ssa.bump(var);
            Formula::eq(Term::indexed(var.clone(), index), rhs)
        }
        EdgeKind::Statement(Statement::Havoc(var)) => {
            ssa.bump(var);
            Formula::True
        }
        EdgeKind::FunctionCall { bindings, .. } => {
            // Actuals are read before any formal is written.
            let actuals: Vec<Term> = bindings
                .iter()
                .map(|(_, actual)| ssa.instantiate_term(actual))
                .collect();
            let parts: Vec<Formula> = bindings
                .iter()
                .zip(actuals)
                .map(|((formal, _), actual)| {
                    let index = ssa.bump(formal);
                    Formula::eq(Term::indexed(formal.clone(), index), actual)
                })
                .collect();
            Formula::and(parts)
        }
        EdgeKind::Return { callee, lhs } => match lhs {
            Some(var) => {
                let ret = format!("{}::{}", callee, RETURN_VAR);
                let rhs = Term::indexed(ret.clone(), ssa.get(&ret));
                let index = ssa.bump(var);
                Formula::eq(Term::indexed(var.clone(), index), rhs)
            }
            None => Formula::True,
        },
    }
}
