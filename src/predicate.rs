//! Predicates and the per-location precision.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use log::debug;

use crate::bdd::Bdd;
use crate::cfa::{Node, NodeId};
use crate::expr::Formula;
use crate::reference::Ref;

/// A tracked fact: a BDD variable bound to its defining formula.
///
/// The formula has every variable at SSA index 1. Predicates are interned by
/// [`PredicateRegistry`], so equal formulas always share the variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    var: u32,
    formula: Formula,
}

impl Predicate {
    pub fn var(&self) -> u32 {
        self.var
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// True when every variable of the predicate is a local of `function`.
    pub fn is_local_to(&self, function: &str) -> bool {
        self.formula
            .vars()
            .iter()
            .all(|v| v.function() == Some(function))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}: {}", self.var, self.formula)
    }
}

#[derive(Debug, Default)]
pub struct PredicateRegistry {
    by_formula: HashMap<Formula, u32>,
    predicates: Vec<Predicate>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `formula`, allocating the next BDD variable if it is new.
    pub fn get_or_create(&mut self, formula: Formula) -> Predicate {
        if let Some(&var) = self.by_formula.get(&formula) {
            return self.predicates[var as usize - 1].clone();
        }
        let var = self.predicates.len() as u32 + 1;
        let p = Predicate {
            var,
            formula: formula.clone(),
        };
        debug!("new predicate {}", p);
        self.by_formula.insert(formula, var);
        self.predicates.push(p.clone());
        p
    }

    pub fn get(&self, var: u32) -> Option<&Predicate> {
        self.predicates.get((var as usize).checked_sub(1)?)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// First-order reading of a region: a disjunction of cubes of predicate
    /// definitions.
    pub fn region_to_formula(&self, bdd: &Bdd, region: Ref) -> Formula {
        let cubes = bdd.cubes(region);
        Formula::or(cubes.into_iter().map(|cube| {
            Formula::and(cube.into_iter().map(|lit| {
                let def = match self.get(lit.unsigned_abs()) {
                    Some(p) => p.formula.clone(),
                    None => panic!("BDD variable {} has no predicate", lit.unsigned_abs()),
                };
                if lit < 0 {
                    def.not()
                } else {
                    def
                }
            }))
        }))
    }
}

/// How the precision is keyed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PredicateScope {
    #[default]
    Location,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PrecisionKey {
    Location(NodeId),
    Function(String),
}

/// Monotonically growing map from locations (or functions) to predicates.
#[derive(Debug, Default)]
pub struct PredicateMap {
    scope: PredicateScope,
    map: HashMap<PrecisionKey, BTreeSet<Predicate>>,
}

impl PredicateMap {
    pub fn new(scope: PredicateScope) -> Self {
        Self {
            scope,
            map: HashMap::new(),
        }
    }

    fn key(&self, node: &Node) -> PrecisionKey {
        match self.scope {
            PredicateScope::Location => PrecisionKey::Location(node.id),
            PredicateScope::Function => PrecisionKey::Function(node.function.clone()),
        }
    }

    /// Predicates tracked at `node`, ordered by BDD variable.
    pub fn predicates(&self, node: &Node) -> Vec<Predicate> {
        self.map
            .get(&self.key(node))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Add predicates at `node`; returns whether the set grew.
    pub fn update(&mut self, node: &Node, predicates: impl IntoIterator<Item = Predicate>) -> bool {
        let key = self.key(node);
        let set = self.map.entry(key).or_default();
        let before = set.len();
        set.extend(predicates);
        set.len() > before
    }

    /// Total number of (key, predicate) pairs.
    pub fn size(&self) -> usize {
        self.map.values().map(|s| s.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfa::CfaBuilder;
    use crate::expr::Term;

    fn x_le(n: i64) -> Formula {
        Formula::le(Term::indexed("main::x", 1), Term::int(n))
    }

    #[test]
    fn test_registry_interns() {
        let mut reg = PredicateRegistry::new();
        let p = reg.get_or_create(x_le(0));
        let q = reg.get_or_create(x_le(1));
        assert_eq!(reg.get_or_create(x_le(0)), p);
        assert_eq!((p.var(), q.var()), (1, 2));
        assert_eq!(reg.get(2), Some(&q));
        assert_eq!(reg.get(0), None);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_region_to_formula() {
        let bdd = Bdd::default();
        let mut reg = PredicateRegistry::new();
        let p = reg.get_or_create(x_le(0));
        let q = reg.get_or_create(x_le(5));

        assert_eq!(reg.region_to_formula(&bdd, bdd.one()), Formula::True);
        assert_eq!(reg.region_to_formula(&bdd, bdd.zero()), Formula::False);

        let region = bdd.cube([p.var() as i32, -(q.var() as i32)]);
        assert_eq!(
            reg.region_to_formula(&bdd, region),
            Formula::and([x_le(0), x_le(5).not()])
        );
    }

    #[test]
    fn test_update_is_monotone() {
        let mut b = CfaBuilder::new();
        let main = b.function("main");
        let cfa = b.build("main");
        let node = cfa.node(main.entry);
        let exit = cfa.node(main.exit);

        let mut reg = PredicateRegistry::new();
        let p = reg.get_or_create(x_le(0));
        let q = reg.get_or_create(x_le(1));

        let mut map = PredicateMap::new(PredicateScope::Location);
        assert!(map.update(node, [p.clone()]));
        assert!(!map.update(node, [p.clone()]));
        assert!(!map.update(node, Vec::new()));
        assert!(map.update(node, [q.clone(), p.clone()]));
        assert_eq!(map.predicates(node), vec![p.clone(), q]);
        assert!(map.predicates(exit).is_empty());

        let mut by_function = PredicateMap::new(PredicateScope::Function);
        assert!(by_function.update(node, [p.clone()]));
        assert_eq!(by_function.predicates(exit), vec![p]);
    }

    #[test]
    fn test_is_local_to() {
        let mut reg = PredicateRegistry::new();
        let local = reg.get_or_create(x_le(0));
        let global = reg.get_or_create(Formula::le(Term::indexed("g", 1), Term::int(0)));
        assert!(local.is_local_to("main"));
        assert!(!local.is_local_to("f"));
        assert!(!global.is_local_to("main"));
    }
}
