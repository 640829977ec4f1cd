//! Petri net model.
//!
//! A net is assembled with a [`NetBuilder`], which validates every node and arc
//! as it is added, and then frozen with [`NetBuilder::finalize`].
//! The finalized [`Net`] fixes the canonical orders (places and transitions
//! sorted by id) and provides the firing semantics over [`Marking`]s.
//!
//! # Examples
//!
//! ```
//! use petri_bdd::net::NetBuilder;
//!
//! let mut builder = NetBuilder::new();
//! builder.add_place("p1", None, 1)?;
//! builder.add_place("p2", None, 0)?;
//! builder.add_transition("t1", None)?;
//! builder.add_arc("p1", "t1", 1)?;
//! builder.add_arc("t1", "p2", 1)?;
//! let net = builder.finalize();
//!
//! let m0 = net.initial_marking();
//! assert_eq!(m0.to_string(), "(1, 0)");
//! let m1 = net.fire(0, &m0)?;
//! assert_eq!(m1.to_string(), "(0, 1)");
//! assert!(net.is_deadlock(&m1)?);
//! # Ok::<(), petri_bdd::error::Error>(())
//! ```

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use log::debug;

use crate::error::{Error, NetError, Result};
use crate::marking::Marking;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Place,
    Transition,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Place => write!(f, "place"),
            NodeKind::Transition => write!(f, "transition"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Place {
    id: String,
    name: String,
    tokens: u8,
}

impl Place {
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Initial token count (0 or 1).
    pub fn tokens(&self) -> u8 {
        self.tokens
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transition {
    id: String,
    name: String,
}

impl Transition {
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Arc {
    source: String,
    target: String,
    weight: u32,
}

impl Arc {
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn target(&self) -> &str {
        &self.target
    }
    /// Multiplicity hint; firing treats every arc as weight 1.
    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// Incrementally validated net under construction.
#[derive(Debug, Clone, Default)]
pub struct NetBuilder {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<Arc>,
    kinds: HashMap<String, NodeKind>,
}

impl NetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, id: &str, kind: NodeKind) -> Result<(), NetError> {
        if self.kinds.contains_key(id) {
            return Err(NetError::DuplicateId(id.to_string()));
        }
        self.kinds.insert(id.to_string(), kind);
        Ok(())
    }

    /// Add a place with an optional display name (defaults to the id).
    pub fn add_place(&mut self, id: &str, name: Option<&str>, tokens: u32) -> Result<&mut Self, NetError> {
        if tokens > 1 {
            return Err(NetError::InitialTokens {
                place: id.to_string(),
                tokens,
            });
        }
        self.register(id, NodeKind::Place)?;
        self.places.push(Place {
            id: id.to_string(),
            name: name.unwrap_or(id).to_string(),
            tokens: tokens as u8,
        });
        Ok(self)
    }

    /// Add a transition with an optional display name (defaults to the id).
    pub fn add_transition(&mut self, id: &str, name: Option<&str>) -> Result<&mut Self, NetError> {
        self.register(id, NodeKind::Transition)?;
        self.transitions.push(Transition {
            id: id.to_string(),
            name: name.unwrap_or(id).to_string(),
        });
        Ok(self)
    }

    /// Add an arc between two previously added nodes of different kinds.
    pub fn add_arc(&mut self, source: &str, target: &str, weight: u32) -> Result<&mut Self, NetError> {
        let from = *self
            .kinds
            .get(source)
            .ok_or_else(|| NetError::UnknownNode(source.to_string()))?;
        let to = *self
            .kinds
            .get(target)
            .ok_or_else(|| NetError::UnknownNode(target.to_string()))?;
        if from == to {
            return Err(NetError::SameKind {
                from: source.to_string(),
                to: target.to_string(),
                kind: from,
            });
        }
        if weight == 0 {
            return Err(NetError::ZeroWeight {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        self.arcs.push(Arc {
            source: source.to_string(),
            target: target.to_string(),
            weight,
        });
        Ok(self)
    }

    /// Derive the canonical orders and the pre/post-sets.
    ///
    /// The builder is left untouched, so calling this again yields an equal net.
    pub fn finalize(&self) -> Net {
        let mut places = self.places.clone();
        places.sort_by(|a, b| a.id.cmp(&b.id));
        let mut transitions = self.transitions.clone();
        transitions.sort_by(|a, b| a.id.cmp(&b.id));

        let place_index: HashMap<String, usize> =
            places.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
        let transition_index: HashMap<String, usize> = transitions
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut pre = vec![Vec::new(); transitions.len()];
        let mut post = vec![Vec::new(); transitions.len()];
        for arc in &self.arcs {
            // Arcs were validated on insertion, so exactly one of these matches.
            if let (Some(&p), Some(&t)) = (place_index.get(&arc.source), transition_index.get(&arc.target)) {
                pre[t].push(p);
            } else if let (Some(&t), Some(&p)) = (transition_index.get(&arc.source), place_index.get(&arc.target)) {
                post[t].push(p);
            }
        }
        for set in pre.iter_mut().chain(post.iter_mut()) {
            set.sort_unstable();
            set.dedup();
        }

        debug!(
            "finalized net with {} places, {} transitions, {} arcs",
            places.len(),
            transitions.len(),
            self.arcs.len()
        );

        Net {
            places,
            transitions,
            arcs: self.arcs.clone(),
            place_index,
            transition_index,
            pre,
            post,
        }
    }
}

/// Finalized, immutable Petri net.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Net {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<Arc>,
    place_index: HashMap<String, usize>,
    transition_index: HashMap<String, usize>,
    pre: Vec<Vec<usize>>,
    post: Vec<Vec<usize>>,
}

impl Net {
    pub fn num_places(&self) -> usize {
        self.places.len()
    }
    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Places in canonical order.
    pub fn places(&self) -> &[Place] {
        &self.places
    }
    /// Transitions in canonical order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
    /// Arcs in insertion order.
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn place(&self, index: usize) -> &Place {
        &self.places[index]
    }
    pub fn transition(&self, index: usize) -> &Transition {
        &self.transitions[index]
    }

    pub fn place_index(&self, id: &str) -> Option<usize> {
        self.place_index.get(id).copied()
    }
    pub fn transition_index(&self, id: &str) -> Option<usize> {
        self.transition_index.get(id).copied()
    }

    /// Sorted indices of the input places of transition `t`.
    pub fn pre_set(&self, t: usize) -> &[usize] {
        &self.pre[t]
    }
    /// Sorted indices of the output places of transition `t`.
    pub fn post_set(&self, t: usize) -> &[usize] {
        &self.post[t]
    }

    /// Input places of `t` that are not also outputs.
    pub fn strict_inputs(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        self.pre[t].iter().copied().filter(move |p| self.post[t].binary_search(p).is_err())
    }
    /// Output places of `t` that are not also inputs.
    pub fn strict_outputs(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        self.post[t].iter().copied().filter(move |p| self.pre[t].binary_search(p).is_err())
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::new(self.places.iter().map(|p| p.tokens).collect())
    }

    fn check_marking(&self, marking: &Marking) -> Result<()> {
        if marking.len() != self.places.len() {
            return Err(Error::MarkingLength {
                expected: self.places.len(),
                actual: marking.len(),
            });
        }
        Ok(())
    }

    fn check_transition(&self, t: usize) -> Result<()> {
        if t >= self.transitions.len() {
            return Err(Error::UnknownTransition(t));
        }
        Ok(())
    }

    pub fn is_enabled(&self, t: usize, marking: &Marking) -> Result<bool> {
        self.check_transition(t)?;
        self.check_marking(marking)?;
        Ok(self.pre[t].iter().all(|&p| marking.is_marked(p)))
    }

    /// Fire transition `t`, producing the successor marking.
    pub fn fire(&self, t: usize, marking: &Marking) -> Result<Marking> {
        if !self.is_enabled(t, marking)? {
            return Err(Error::NotEnabled(self.transitions[t].id.clone()));
        }
        let mut tokens = marking.tokens().to_vec();
        for p in self.strict_inputs(t) {
            tokens[p] -= 1;
        }
        for p in self.strict_outputs(t) {
            tokens[p] = tokens[p].saturating_add(1);
        }
        Ok(Marking::new(tokens))
    }

    /// A strict output place of `t` that already holds a token in `marking`,
    /// i.e. a place firing `t` would overflow in a 1-safe net.
    pub fn overflow_place(&self, t: usize, marking: &Marking) -> Option<usize> {
        self.strict_outputs(t).find(|&p| marking.is_marked(p))
    }

    /// Transitions enabled in `marking`, in canonical order.
    pub fn enabled_transitions(&self, marking: &Marking) -> Result<Vec<usize>> {
        self.check_marking(marking)?;
        Ok((0..self.transitions.len())
            .filter(|&t| self.pre[t].iter().all(|&p| marking.is_marked(p)))
            .collect())
    }

    pub fn is_deadlock(&self, marking: &Marking) -> Result<bool> {
        Ok(self.enabled_transitions(marking)?.is_empty())
    }

    /// Names of the marked places, e.g. `{idle, ready}`.
    pub fn display_marking(&self, marking: &Marking) -> String {
        let names: Vec<&str> = marking
            .marked_places()
            .filter_map(|p| self.places.get(p))
            .map(|p| p.name.as_str())
            .collect();
        format!("{{{}}}", names.join(", "))
    }
}
