//! Enumerative reachability.
//!
//! Both searches visit every marking reachable from the initial one and
//! return the same set; the breadth-first one is bounded by a state ceiling.

use std::collections::{BTreeSet, VecDeque};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::marking::Marking;
use crate::net::Net;

pub const DEFAULT_MAX_STATES: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ExplicitExplorer<'a> {
    net: &'a Net,
    max_states: usize,
}

impl<'a> ExplicitExplorer<'a> {
    pub fn new(net: &'a Net) -> Self {
        Self {
            net,
            max_states: DEFAULT_MAX_STATES,
        }
    }

    /// Ceiling on the number of markings the breadth-first search may collect.
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    pub fn max_states(&self) -> usize {
        self.max_states
    }

    /// Successors of `marking`, one per enabled transition, in canonical transition order.
    ///
    /// Fails with [`Error::Unsafe`] if some enabled transition would put a
    /// second token on one of its output places.
    pub fn successors(&self, marking: &Marking) -> Result<Vec<Marking>> {
        let enabled = self.net.enabled_transitions(marking)?;
        let mut result = Vec::with_capacity(enabled.len());
        for t in enabled {
            if let Some(p) = self.net.overflow_place(t, marking) {
                return Err(Error::Unsafe {
                    transition: self.net.transition(t).id().to_string(),
                    place: self.net.place(p).id().to_string(),
                });
            }
            result.push(self.net.fire(t, marking)?);
        }
        Ok(result)
    }

    /// Breadth-first search.
    pub fn bfs(&self) -> Result<BTreeSet<Marking>> {
        info!("Explicit BFS over {} places", self.net.num_places());

        let initial = self.net.initial_marking();
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(initial.clone());
        queue.push_back(initial);

        while let Some(marking) = queue.pop_front() {
            for next in self.successors(&marking)? {
                if visited.insert(next.clone()) {
                    if visited.len() > self.max_states {
                        warn!("Explicit BFS exceeded {} states", self.max_states);
                        return Err(Error::StateLimit { limit: self.max_states });
                    }
                    queue.push_back(next);
                }
            }
        }

        info!("Explicit BFS found {} markings", visited.len());
        Ok(visited)
    }

    /// Depth-first search with an explicit stack (no ceiling).
    pub fn dfs(&self) -> Result<BTreeSet<Marking>> {
        info!("Explicit DFS over {} places", self.net.num_places());

        let initial = self.net.initial_marking();
        let mut visited = BTreeSet::new();
        let mut stack = vec![initial.clone()];
        visited.insert(initial);

        while let Some(marking) = stack.pop() {
            for next in self.successors(&marking)? {
                if visited.insert(next.clone()) {
                    stack.push(next);
                }
            }
        }

        info!("Explicit DFS found {} markings", visited.len());
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::net::NetBuilder;

    /// Ring of `n` places with one token circulating through `n` transitions.
    fn ring(n: usize) -> Net {
        let mut builder = NetBuilder::new();
        for i in 0..n {
            builder.add_place(&format!("p{}", i), None, (i == 0) as u32).unwrap();
            builder.add_transition(&format!("t{}", i), None).unwrap();
        }
        for i in 0..n {
            builder.add_arc(&format!("p{}", i), &format!("t{}", i), 1).unwrap();
            builder.add_arc(&format!("t{}", i), &format!("p{}", (i + 1) % n), 1).unwrap();
        }
        builder.finalize()
    }

    /// `n` independent two-state components.
    fn toggles(n: usize) -> Net {
        let mut builder = NetBuilder::new();
        for i in 0..n {
            builder.add_place(&format!("a{}", i), None, 1).unwrap();
            builder.add_place(&format!("b{}", i), None, 0).unwrap();
            builder.add_transition(&format!("f{}", i), None).unwrap();
            builder.add_transition(&format!("g{}", i), None).unwrap();
            builder.add_arc(&format!("a{}", i), &format!("f{}", i), 1).unwrap();
            builder.add_arc(&format!("f{}", i), &format!("b{}", i), 1).unwrap();
            builder.add_arc(&format!("b{}", i), &format!("g{}", i), 1).unwrap();
            builder.add_arc(&format!("g{}", i), &format!("a{}", i), 1).unwrap();
        }
        builder.finalize()
    }

    #[test]
    fn test_simple_chain() {
        let mut builder = NetBuilder::new();
        builder.add_place("p1", None, 1).unwrap();
        builder.add_place("p2", None, 0).unwrap();
        builder.add_transition("t1", None).unwrap();
        builder.add_arc("p1", "t1", 1).unwrap();
        builder.add_arc("t1", "p2", 1).unwrap();
        let net = builder.finalize();

        let explorer = ExplicitExplorer::new(&net);
        let expected = BTreeSet::from([Marking::new(vec![1, 0]), Marking::new(vec![0, 1])]);
        assert_eq!(explorer.bfs().unwrap(), expected);
        assert_eq!(explorer.dfs().unwrap(), expected);
    }

    #[test]
    fn test_ring() {
        let net = ring(5);
        let explorer = ExplicitExplorer::new(&net);
        let states = explorer.bfs().unwrap();
        assert_eq!(states.len(), 5);
        for m in &states {
            assert_eq!(m.marked_places().count(), 1);
        }
        assert_eq!(explorer.dfs().unwrap(), states);
    }

    #[test]
    fn test_toggles() {
        let net = toggles(4);
        let explorer = ExplicitExplorer::new(&net);
        let states = explorer.bfs().unwrap();
        assert_eq!(states.len(), 16);
        assert_eq!(explorer.dfs().unwrap(), states);
    }

    #[test]
    fn test_state_limit() {
        let net = toggles(4);

        let explorer = ExplicitExplorer::new(&net).with_max_states(10);
        assert_eq!(explorer.bfs(), Err(Error::StateLimit { limit: 10 }));

        // Exactly at the ceiling is fine.
        let explorer = ExplicitExplorer::new(&net).with_max_states(16);
        assert_eq!(explorer.bfs().unwrap().len(), 16);

        // Depth-first search has no ceiling.
        let explorer = ExplicitExplorer::new(&net).with_max_states(1);
        assert_eq!(explorer.dfs().unwrap().len(), 16);
    }

    #[test]
    fn test_unsafe_net() {
        let mut builder = NetBuilder::new();
        builder.add_place("p", None, 1).unwrap();
        builder.add_place("q", None, 0).unwrap();
        builder.add_transition("t", None).unwrap();
        builder.add_arc("p", "t", 1).unwrap();
        builder.add_arc("t", "p", 1).unwrap();
        builder.add_arc("t", "q", 1).unwrap();
        let net = builder.finalize();

        let explorer = ExplicitExplorer::new(&net);
        let expected = Error::Unsafe {
            transition: "t".to_string(),
            place: "q".to_string(),
        };
        assert_eq!(explorer.bfs(), Err(expected.clone()));
        assert_eq!(explorer.dfs(), Err(expected));
    }

    #[test]
    fn test_no_transitions() {
        let mut builder = NetBuilder::new();
        builder.add_place("p", None, 1).unwrap();
        let net = builder.finalize();

        let states = ExplicitExplorer::new(&net).bfs().unwrap();
        assert_eq!(states, BTreeSet::from([Marking::new(vec![1])]));
    }
}
