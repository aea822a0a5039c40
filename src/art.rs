//! Abstract reachability tree.
//!
//! States live in an arena indexed by [`StateId`]. Removed states leave a
//! hole, so ids stay stable for the whole run.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::cfa::{EdgeId, NodeId};
use crate::domain::AbstractState;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// States affected by a subtree removal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Removal {
    pub removed: Vec<StateId>,
    /// Live states that lost their coverer.
    pub uncovered: Vec<StateId>,
}

#[derive(Debug)]
pub struct Art {
    states: Vec<Option<AbstractState>>,
    children: HashMap<StateId, Vec<StateId>>,
    /// coverer -> covered states
    coverage: BTreeMap<StateId, BTreeSet<StateId>>,
    covered_by: HashMap<StateId, StateId>,
    by_location: HashMap<NodeId, Vec<StateId>>,
    num_live: usize,
}

impl Art {
    pub fn new(root: AbstractState) -> Self {
        let mut art = Self {
            states: Vec::new(),
            children: HashMap::new(),
            coverage: BTreeMap::new(),
            covered_by: HashMap::new(),
            by_location: HashMap::new(),
            num_live: 0,
        };
        art.insert(root);
        art
    }

    fn insert(&mut self, state: AbstractState) -> StateId {
        let id = StateId(self.states.len());
        self.by_location.entry(state.location).or_default().push(id);
        self.states.push(Some(state));
        self.num_live += 1;
        id
    }

    pub fn root(&self) -> StateId {
        StateId(0)
    }

    pub fn is_live(&self, id: StateId) -> bool {
        matches!(self.states.get(id.0), Some(Some(_)))
    }

    pub fn get(&self, id: StateId) -> &AbstractState {
        match self.states.get(id.0) {
            Some(Some(state)) => state,
            _ => panic!("State {} is not in the tree", id),
        }
    }

    /// Number of live states.
    pub fn len(&self) -> usize {
        self.num_live
    }

    pub fn is_empty(&self) -> bool {
        self.num_live == 0
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &AbstractState)> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (StateId(i), s)))
    }

    pub fn states_at(&self, location: NodeId) -> &[StateId] {
        self.by_location
            .get(&location)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Add `state` as a child of its parent.
    pub fn add_child(&mut self, state: AbstractState) -> StateId {
        let parent = match state.parent {
            Some(p) => p,
            None => panic!("Only the root has no parent"),
        };
        assert!(self.is_live(parent), "Parent {} is not in the tree", parent);
        let id = self.insert(state);
        self.children.entry(parent).or_default().push(id);
        id
    }

    pub fn children(&self, id: StateId) -> &[StateId] {
        self.children.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn cover(&mut self, covered: StateId, coverer: StateId) {
        assert_ne!(covered, coverer);
        if let Some(Some(state)) = self.states.get_mut(covered.0) {
            state.covered = true;
        }
        self.coverage.entry(coverer).or_default().insert(covered);
        self.covered_by.insert(covered, coverer);
    }

    /// States covered by `coverer`.
    pub fn covered_by(&self, coverer: StateId) -> Vec<StateId> {
        self.coverage
            .get(&coverer)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Subtree of `id` in preorder.
    pub fn subtree(&self, id: StateId, include_root: bool) -> Vec<StateId> {
        let mut res = Vec::new();
        let mut stack = vec![id];
        while let Some(s) = stack.pop() {
            if s != id || include_root {
                res.push(s);
            }
            stack.extend(self.children(s).iter().rev());
        }
        res
    }

    /// Remove the given states, which must be closed under descendants.
    pub fn remove(&mut self, ids: &[StateId]) -> Removal {
        let mut removal = Removal::default();
        for &id in ids {
            let Some(state) = self.states.get_mut(id.0).and_then(Option::take) else {
                continue;
            };
            self.num_live -= 1;
            removal.removed.push(id);
            if let Some(list) = self.by_location.get_mut(&state.location) {
                list.retain(|&s| s != id);
            }
            self.children.remove(&id);
            if let Some(parent) = state.parent {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|&s| s != id);
                }
            }
            if let Some(coverer) = self.covered_by.remove(&id) {
                if let Some(set) = self.coverage.get_mut(&coverer) {
                    set.remove(&id);
                }
            }
        }
        for &id in &removal.removed {
            for covered in self.coverage.remove(&id).unwrap_or_default() {
                self.covered_by.remove(&covered);
                if let Some(Some(state)) = self.states.get_mut(covered.0) {
                    state.covered = false;
                    removal.uncovered.push(covered);
                }
            }
        }
        removal
    }

    /// States from the root to `id`.
    pub fn path_to(&self, id: StateId) -> Vec<StateId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.get(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Edges from the root to `id`.
    pub fn edges_to(&self, id: StateId) -> Vec<EdgeId> {
        self.path_to(id)
            .into_iter()
            .filter_map(|s| self.get(s).edge)
            .collect()
    }
}
