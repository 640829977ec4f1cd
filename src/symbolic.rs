//! Symbolic reachability over BDDs.
//!
//! Place `i` (in canonical order) owns two adjacent BDD variables:
//! `2i+1` for the current state and `2i+2` for the next state.
//! The reachable set is the least fixed point of `S ∪ Image(S)` starting
//! from the initial marking, where the image is a relational product with
//! the transition relation followed by renaming the next-state variables
//! back to the current-state ones.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};
use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::marking::Marking;
use crate::net::Net;
use crate::reachable::ReachableSet;
use crate::reference::Ref;

pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Current-state variable of place `i`.
pub fn present_var(place: usize) -> u32 {
    2 * place as u32 + 1
}

/// Next-state variable of place `i`.
pub fn next_var(place: usize) -> u32 {
    2 * place as u32 + 2
}

/// How the image of a state set is computed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ImageMode {
    /// One relational product with the disjunction of all transition relations.
    #[default]
    Monolithic,
    /// Disjunction of one relational product per transition.
    Partitioned,
}

#[derive(Debug, Copy, Clone)]
pub struct SymbolicConfig {
    pub max_iterations: usize,
    pub image: ImageMode,
}

impl Default for SymbolicConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            image: ImageMode::default(),
        }
    }
}

pub struct SymbolicEngine<'a> {
    bdd: &'a Bdd,
    net: &'a Net,
    config: SymbolicConfig,
    present_vars: Vec<u32>,
    next_to_present: HashMap<u32, u32>,
    relations: Vec<Ref>,
    relation: Option<Ref>,
}

impl<'a> SymbolicEngine<'a> {
    pub fn new(bdd: &'a Bdd, net: &'a Net, config: SymbolicConfig) -> Self {
        let n = net.num_places();
        let present_vars: Vec<u32> = (0..n).map(present_var).collect();
        let next_to_present: HashMap<u32, u32> = (0..n).map(|i| (next_var(i), present_var(i))).collect();

        let mut engine = Self {
            bdd,
            net,
            config,
            present_vars,
            next_to_present,
            relations: Vec::new(),
            relation: None,
        };
        engine.relations = (0..net.num_transitions())
            .map(|t| engine.transition_relation(t))
            .collect();
        if engine.config.image == ImageMode::Monolithic {
            engine.relation = Some(bdd.apply_or_many(engine.relations.iter().copied()));
        }
        debug!(
            "symbolic engine: {} places, {} transitions, {:?} image",
            n,
            net.num_transitions(),
            config.image
        );
        engine
    }

    pub fn bdd(&self) -> &'a Bdd {
        self.bdd
    }

    pub fn net(&self) -> &'a Net {
        self.net
    }

    pub fn config(&self) -> &SymbolicConfig {
        &self.config
    }

    /// Current-state variables, ascending.
    pub fn present_vars(&self) -> &[u32] {
        &self.present_vars
    }

    /// Minterm of `marking` over the current-state variables.
    pub fn encode_marking(&self, marking: &Marking) -> Result<Ref> {
        self.encode(marking, present_var)
    }

    /// Minterm of `marking` over the next-state variables.
    pub fn encode_marking_next(&self, marking: &Marking) -> Result<Ref> {
        self.encode(marking, next_var)
    }

    /// Reachable-set view of an explicitly enumerated set of markings.
    ///
    /// The result reports zero fixed-point iterations.
    pub fn encode_set(&self, markings: &BTreeSet<Marking>) -> Result<SymbolicStates<'a>> {
        let mut states = self.bdd.zero();
        for marking in markings {
            states = self.bdd.apply_or(states, self.encode_marking(marking)?);
        }
        debug!("encoded {} markings into {} BDD nodes", markings.len(), self.bdd.size(states));
        Ok(SymbolicStates {
            bdd: self.bdd,
            states,
            present_vars: self.present_vars.clone(),
            iterations: 0,
        })
    }

    fn encode(&self, marking: &Marking, var: fn(usize) -> u32) -> Result<Ref> {
        if marking.len() != self.net.num_places() {
            return Err(Error::MarkingLength {
                expected: self.net.num_places(),
                actual: marking.len(),
            });
        }
        let literals = (0..marking.len()).map(|i| {
            let v = var(i) as i32;
            if marking.is_marked(i) {
                v
            } else {
                -v
            }
        });
        Ok(self.bdd.cube(literals))
    }

    /// Conjunction of the current-state variables of the input places of `t`.
    pub fn enabled(&self, t: usize) -> Ref {
        self.bdd.cube(self.net.pre_set(t).iter().map(|&p| present_var(p) as i32))
    }

    /// Relation `R_t(x, x')` of transition `t`.
    pub fn transition_relation(&self, t: usize) -> Ref {
        let bdd = self.bdd;
        let pre = self.net.pre_set(t);
        let post = self.net.post_set(t);

        // Built bottom-up, from the last place to the first.
        let mut relation = bdd.one();
        for p in (0..self.net.num_places()).rev() {
            let x = present_var(p) as i32;
            let y = next_var(p) as i32;
            let constraint = match (pre.binary_search(&p).is_ok(), post.binary_search(&p).is_ok()) {
                (true, false) => bdd.cube([x, -y]),
                (false, true) => bdd.cube([y]),
                (true, true) => bdd.cube([x, y]),
                (false, false) => bdd.apply_eq(bdd.mk_var(x as u32), bdd.mk_var(y as u32)),
            };
            relation = bdd.apply_and(constraint, relation);
        }
        relation
    }

    /// Global transition relation, the disjunction of all `R_t`.
    pub fn relation(&self) -> Ref {
        match self.relation {
            Some(relation) => relation,
            None => self.bdd.apply_or_many(self.relations.iter().copied()),
        }
    }

    /// Successors of `states` in one step.
    pub fn image(&self, states: Ref) -> Ref {
        let bdd = self.bdd;
        let next = match self.relation {
            Some(relation) => bdd.rel_product(states, relation, &self.present_vars),
            None => bdd.apply_or_many(
                self.relations
                    .iter()
                    .map(|&r| bdd.rel_product(states, r, &self.present_vars)),
            ),
        };
        bdd.rename_vars(next, &self.next_to_present)
    }

    /// Least fixed point of the image, starting from the initial marking.
    pub fn reachable(&self) -> Result<SymbolicStates<'a>> {
        let bdd = self.bdd;
        info!("Symbolic reachability over {} places", self.net.num_places());

        let mut reached = self.encode_marking(&self.net.initial_marking())?;
        let mut iterations = 0;
        loop {
            iterations += 1;
            if iterations > self.config.max_iterations {
                warn!("No fixed point after {} iterations", self.config.max_iterations);
                return Err(Error::IterationLimit {
                    limit: self.config.max_iterations,
                });
            }

            let new = self.image(reached);
            if bdd.is_implies(new, reached) {
                break;
            }
            reached = bdd.apply_or(reached, new);
            debug!("iteration {}: reached has {} nodes", iterations, bdd.size(reached));
        }

        info!(
            "Symbolic fixed point after {} iterations, {} BDD nodes",
            iterations,
            bdd.size(reached)
        );

        self.check_safety(reached)?;

        Ok(SymbolicStates {
            bdd,
            states: reached,
            present_vars: self.present_vars.clone(),
            iterations,
        })
    }

    /// Fails if some state in `reached` enables a transition whose strict
    /// output place already holds a token.
    fn check_safety(&self, reached: Ref) -> Result<()> {
        let bdd = self.bdd;
        for t in 0..self.net.num_transitions() {
            let enabled = bdd.apply_and(reached, self.enabled(t));
            if bdd.is_zero(enabled) {
                continue;
            }
            for p in self.net.strict_outputs(t) {
                let overflow = bdd.apply_and(enabled, bdd.mk_var(present_var(p)));
                if !bdd.is_zero(overflow) {
                    return Err(Error::Unsafe {
                        transition: self.net.transition(t).id().to_string(),
                        place: self.net.place(p).id().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Smallest marking of `states` that enables no transition.
    pub fn find_deadlock(&self, states: &SymbolicStates<'_>) -> Option<Marking> {
        let bdd = self.bdd;
        let disabled = bdd.apply_and_many((0..self.net.num_transitions()).map(|t| -self.enabled(t)));
        let dead = bdd.apply_and(states.states(), disabled);
        bdd.min_sat(dead, &self.present_vars)
            .map(|bits| Marking::from_bits(&bits))
    }
}

/// Reachable set held as a BDD over the current-state variables.
#[derive(Debug, Clone)]
pub struct SymbolicStates<'a> {
    bdd: &'a Bdd,
    states: Ref,
    present_vars: Vec<u32>,
    iterations: usize,
}

impl SymbolicStates<'_> {
    pub fn states(&self) -> Ref {
        self.states
    }

    /// Number of image computations until the fixed point was detected.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of markings, without enumerating them.
    pub fn count(&self) -> BigUint {
        // Next-state variables are free in `states`.
        let n = self.present_vars.len();
        self.bdd.sat_count(self.states, 2 * n) >> n
    }

    pub fn node_count(&self) -> u64 {
        self.bdd.size(self.states)
    }

    pub fn to_markings(&self) -> BTreeSet<Marking> {
        self.markings().collect()
    }
}

impl ReachableSet for SymbolicStates<'_> {
    fn markings(&self) -> Box<dyn Iterator<Item = Marking> + '_> {
        Box::new(
            self.bdd
                .assignments(self.states, &self.present_vars)
                .map(|bits| Marking::from_bits(&bits)),
        )
    }

    fn contains(&self, marking: &Marking) -> bool {
        if marking.len() != self.present_vars.len() || marking.tokens().iter().any(|&k| k > 1) {
            return false;
        }
        self.bdd
            .evaluate(self.states, |v| v % 2 == 1 && marking.is_marked(((v - 1) / 2) as usize))
    }

    fn num_markings(&self) -> BigUint {
        self.count()
    }

    fn is_empty(&self) -> bool {
        self.bdd.is_zero(self.states)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::explicit::ExplicitExplorer;
    use crate::net::NetBuilder;

    fn chain(n: usize) -> Net {
        let mut builder = NetBuilder::new();
        for i in 0..n {
            builder.add_place(&format!("p{}", i), None, (i == 0) as u32).unwrap();
        }
        for i in 0..n - 1 {
            let t = format!("t{}", i);
            builder.add_transition(&t, None).unwrap();
            builder.add_arc(&format!("p{}", i), &t, 1).unwrap();
            builder.add_arc(&t, &format!("p{}", i + 1), 1).unwrap();
        }
        builder.finalize()
    }

    /// Two processes competing for one shared resource.
    fn mutex() -> Net {
        let mut builder = NetBuilder::new();
        for place in ["idle1", "idle2", "lock"] {
            builder.add_place(place, None, 1).unwrap();
        }
        for place in ["crit1", "crit2"] {
            builder.add_place(place, None, 0).unwrap();
        }
        for i in ["1", "2"] {
            let enter = format!("enter{}", i);
            let leave = format!("leave{}", i);
            builder.add_transition(&enter, None).unwrap();
            builder.add_transition(&leave, None).unwrap();
            builder.add_arc(&format!("idle{}", i), &enter, 1).unwrap();
            builder.add_arc("lock", &enter, 1).unwrap();
            builder.add_arc(&enter, &format!("crit{}", i), 1).unwrap();
            builder.add_arc(&format!("crit{}", i), &leave, 1).unwrap();
            builder.add_arc(&leave, &format!("idle{}", i), 1).unwrap();
            builder.add_arc(&leave, "lock", 1).unwrap();
        }
        builder.finalize()
    }

    #[test]
    fn test_variable_layout() {
        assert_eq!(present_var(0), 1);
        assert_eq!(next_var(0), 2);
        assert_eq!(present_var(3), 7);
        assert_eq!(next_var(3), 8);
    }

    #[test]
    fn test_encode_marking() {
        let bdd = Bdd::default();
        let net = chain(3);
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());

        let m = Marking::new(vec![1, 0, 1]);
        assert_eq!(engine.encode_marking(&m).unwrap(), bdd.cube([1, -3, 5]));
        assert_eq!(engine.encode_marking_next(&m).unwrap(), bdd.cube([2, -4, 6]));
        assert_eq!(
            engine.encode_marking(&Marking::new(vec![1])),
            Err(Error::MarkingLength { expected: 3, actual: 1 })
        );
    }

    #[test]
    fn test_image_single_step() {
        let bdd = Bdd::default();
        let net = chain(3);
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());

        let m0 = engine.encode_marking(&Marking::new(vec![1, 0, 0])).unwrap();
        let m1 = engine.encode_marking(&Marking::new(vec![0, 1, 0])).unwrap();
        let m2 = engine.encode_marking(&Marking::new(vec![0, 0, 1])).unwrap();
        assert_eq!(engine.image(m0), m1);
        assert_eq!(engine.image(m1), m2);
        assert_eq!(engine.image(m2), bdd.zero());
        assert_eq!(engine.image(bdd.apply_or(m0, m1)), bdd.apply_or(m1, m2));
    }

    #[test]
    fn test_example_scenario() {
        let bdd = Bdd::default();
        let net = chain(2);
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());

        let states = engine.reachable().unwrap();
        let expected = BTreeSet::from([Marking::new(vec![1, 0]), Marking::new(vec![0, 1])]);
        assert_eq!(states.to_markings(), expected);
        assert_eq!(states.count(), BigUint::from(2u32));
        assert!(states.contains(&Marking::new(vec![0, 1])));
        assert!(!states.contains(&Marking::new(vec![1, 1])));
        assert!(!states.contains(&Marking::new(vec![1])));
        assert_eq!(engine.find_deadlock(&states), Some(Marking::new(vec![0, 1])));
    }

    #[test]
    fn test_encode_set() {
        let bdd = Bdd::default();
        let net = mutex();
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());

        let explicit = ExplicitExplorer::new(&net).bfs().unwrap();
        let encoded = engine.encode_set(&explicit).unwrap();
        assert_eq!(encoded.to_markings(), explicit);
        assert_eq!(encoded.states(), engine.reachable().unwrap().states());
        assert_eq!(encoded.iterations(), 0);

        let empty = engine.encode_set(&BTreeSet::new()).unwrap();
        assert!(empty.is_empty());

        let wrong = BTreeSet::from([Marking::new(vec![1, 0])]);
        assert_eq!(
            engine.encode_set(&wrong).unwrap_err(),
            Error::MarkingLength { expected: 5, actual: 2 }
        );
    }

    #[test]
    fn test_contains_rejects_multiple_tokens() {
        let bdd = Bdd::default();
        let net = chain(2);
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
        let states = engine.reachable().unwrap();
        let explicit = ExplicitExplorer::new(&net).bfs().unwrap();

        for marking in [Marking::new(vec![1, 0]), Marking::new(vec![2, 0]), Marking::new(vec![0, 3])] {
            assert_eq!(states.contains(&marking), explicit.contains(&marking));
        }
        assert!(!states.contains(&Marking::new(vec![2, 0])));
    }

    #[test]
    fn test_mutex() {
        let bdd = Bdd::default();
        let net = mutex();

        for image in [ImageMode::Monolithic, ImageMode::Partitioned] {
            let config = SymbolicConfig {
                image,
                ..Default::default()
            };
            let engine = SymbolicEngine::new(&bdd, &net, config);
            let states = engine.reachable().unwrap();
            let explicit = ExplicitExplorer::new(&net).bfs().unwrap();

            assert_eq!(states.to_markings(), explicit);
            assert_eq!(states.count(), BigUint::from(3u32));
            assert_eq!(engine.find_deadlock(&states), None);

            // Never both in the critical section.
            let crit1 = net.place_index("crit1").unwrap();
            let crit2 = net.place_index("crit2").unwrap();
            for m in states.markings() {
                assert!(!(m.is_marked(crit1) && m.is_marked(crit2)));
            }
        }
    }

    #[test]
    fn test_relation_modes_agree() {
        let bdd = Bdd::default();
        let net = mutex();

        let monolithic = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
        let partitioned = SymbolicEngine::new(
            &bdd,
            &net,
            SymbolicConfig {
                image: ImageMode::Partitioned,
                ..Default::default()
            },
        );
        assert_eq!(monolithic.relation(), partitioned.relation());
        let initial = monolithic.encode_marking(&net.initial_marking()).unwrap();
        assert_eq!(monolithic.image(initial), partitioned.image(initial));
    }

    #[test]
    fn test_iterations() {
        let bdd = Bdd::default();
        let net = chain(5);

        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
        let states = engine.reachable().unwrap();
        assert_eq!(states.iterations(), 5);
        assert_eq!(states.count(), BigUint::from(5u32));

        let config = SymbolicConfig {
            max_iterations: 2,
            ..Default::default()
        };
        let engine = SymbolicEngine::new(&bdd, &net, config);
        assert_eq!(engine.reachable().unwrap_err(), Error::IterationLimit { limit: 2 });
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

        let bdd = Bdd::default();
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
        assert_eq!(
            engine.reachable().unwrap_err(),
            Error::Unsafe {
                transition: "t".to_string(),
                place: "q".to_string(),
            }
        );
    }

    #[test]
    fn test_source_transition_and_self_loop() {
        let mut builder = NetBuilder::new();
        builder.add_place("p", None, 0).unwrap();
        builder.add_transition("produce", None).unwrap();
        builder.add_transition("consume", None).unwrap();
        builder.add_arc("produce", "p", 1).unwrap();
        builder.add_arc("p", "consume", 1).unwrap();
        let net = builder.finalize();

        let bdd = Bdd::default();
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
        // Producing onto a marked place overflows it.
        assert!(matches!(engine.reachable(), Err(Error::Unsafe { .. })));

        let mut builder = NetBuilder::new();
        builder.add_place("p", None, 1).unwrap();
        builder.add_transition("spin", None).unwrap();
        builder.add_arc("p", "spin", 1).unwrap();
        builder.add_arc("spin", "p", 1).unwrap();
        let net = builder.finalize();

        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
        let states = engine.reachable().unwrap();
        assert_eq!(states.to_markings(), BTreeSet::from([Marking::new(vec![1])]));
        assert_eq!(engine.find_deadlock(&states), None);
    }

    #[test]
    fn test_empty_net() {
        let bdd = Bdd::default();
        let net = NetBuilder::new().finalize();
        let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());

        let states = engine.reachable().unwrap();
        assert_eq!(states.count(), BigUint::from(1u32));
        assert_eq!(states.to_markings(), BTreeSet::from([Marking::new(vec![])]));
        assert_eq!(engine.find_deadlock(&states), Some(Marking::new(vec![])));
    }
}
