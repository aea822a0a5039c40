//! Abstract states, their partial order, merge and coverage.

use crate::art::{Art, StateId};
use crate::bdd::Bdd;
use crate::cfa::{EdgeId, NodeId};
use crate::reference::Ref;

/// Saved caller context of an open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallFrame {
    /// Caller's region at the call site.
    pub region: Ref,
    pub return_site: NodeId,
}

#[derive(Debug, Clone)]
pub struct AbstractState {
    pub location: NodeId,
    pub region: Ref,
    pub stack: Vec<CallFrame>,
    pub parent: Option<StateId>,
    /// Edge this state was reached by; `None` for the root.
    pub edge: Option<EdgeId>,
    pub covered: bool,
}

impl AbstractState {
    pub fn root(location: NodeId, region: Ref) -> Self {
        Self {
            location,
            region,
            stack: Vec::new(),
            parent: None,
            edge: None,
            covered: false,
        }
    }

    /// Same location and same calling context.
    pub fn is_comparable(&self, other: &AbstractState) -> bool {
        self.location == other.location && self.stack == other.stack
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AbstractDomain;

impl AbstractDomain {
    pub fn bottom(&self, bdd: &Bdd) -> Ref {
        bdd.zero()
    }

    pub fn top(&self, bdd: &Bdd) -> Ref {
        bdd.one()
    }

    pub fn is_bottom(&self, bdd: &Bdd, state: &AbstractState) -> bool {
        bdd.is_zero(state.region)
    }

    /// Entailment: comparable states whose regions imply each other.
    pub fn is_less_or_equal(&self, bdd: &Bdd, a: &AbstractState, b: &AbstractState) -> bool {
        a.is_comparable(b) && bdd.is_implies(a.region, b.region)
    }

    /// States are never joined.
    pub fn merge<'a>(&self, _a: &'a AbstractState, b: &'a AbstractState) -> &'a AbstractState {
        b
    }

    /// Find an uncovered live state, other than `id`, that covers `id`.
    pub fn stop(&self, bdd: &Bdd, art: &Art, id: StateId) -> Option<StateId> {
        let state = art.get(id);
        art.states_at(state.location)
            .iter()
            .copied()
            .filter(|&other| other != id)
            .find(|&other| {
                let candidate = art.get(other);
                !candidate.covered && self.is_less_or_equal(bdd, state, candidate)
            })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn state(bdd: &Bdd, location: usize, literals: &[i32]) -> AbstractState {
        AbstractState::root(NodeId(location), bdd.cube(literals.iter().copied()))
    }

    #[test]
    fn test_entailment_preorder() {
        let bdd = Bdd::default();
        let d = AbstractDomain;
        // More predicates known, smaller region.
        let s1 = state(&bdd, 0, &[1]);
        let s2 = state(&bdd, 0, &[1, -2]);
        let s3 = state(&bdd, 0, &[1, -2, 3]);

        for s in [&s1, &s2, &s3] {
            assert!(d.is_less_or_equal(&bdd, s, s));
        }
        assert!(d.is_less_or_equal(&bdd, &s3, &s2));
        assert!(d.is_less_or_equal(&bdd, &s2, &s1));
        assert!(d.is_less_or_equal(&bdd, &s3, &s1));
        assert!(!d.is_less_or_equal(&bdd, &s1, &s3));
    }

    #[test]
    fn test_incomparable_states() {
        let bdd = Bdd::default();
        let d = AbstractDomain;
        let a = state(&bdd, 0, &[1]);
        let b = state(&bdd, 1, &[]);
        assert!(!d.is_less_or_equal(&bdd, &a, &b));

        let mut c = state(&bdd, 0, &[]);
        c.stack.push(CallFrame {
            region: bdd.one(),
            return_site: NodeId(3),
        });
        assert!(!d.is_less_or_equal(&bdd, &a, &c));
    }

    #[test]
    fn test_bottom_top_merge() {
        let bdd = Bdd::default();
        let d = AbstractDomain;
        let a = state(&bdd, 0, &[1]);
        let b = state(&bdd, 0, &[2]);
        assert!(std::ptr::eq(d.merge(&a, &b), &b));
        let bottom = AbstractState::root(NodeId(0), d.bottom(&bdd));
        assert!(d.is_bottom(&bdd, &bottom));
        assert!(d.is_less_or_equal(&bdd, &bottom, &a));
        let top = AbstractState::root(NodeId(0), d.top(&bdd));
        assert!(d.is_less_or_equal(&bdd, &a, &top));
    }
}
