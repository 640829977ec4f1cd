//! # petri-bdd: reachability analysis of 1-safe Petri nets
//!
//! **`petri-bdd`** computes the reachable markings of a 1-safe Petri net, either by
//! explicit enumeration or symbolically with **Binary Decision Diagrams (BDDs)**,
//! and answers questions about the result: is there a deadlock, and which reachable
//! marking extremizes a linear objective.
//!
//! ## The BDD manager
//!
//! All Boolean functions live inside one [`Bdd`][crate::bdd::Bdd] manager and are referenced
//! by lightweight [`Ref`][crate::reference::Ref] handles. The manager hash-conses nodes
//! (so a function has exactly one representation for the fixed variable order) and
//! memoizes ITE results in a computed table. Complement edges make negation O(1).
//! Variables are 1-indexed, 0 is reserved for the terminal.
//!
//! ## Nets
//!
//! A [`NetBuilder`][crate::net::NetBuilder] validates places, transitions and arcs as they
//! are added; [`finalize`][crate::net::NetBuilder::finalize] freezes them into a
//! [`Net`][crate::net::Net] with places and transitions sorted by id. That order is the
//! index order of every [`Marking`][crate::marking::Marking].
//!
//! ## Basic Usage
//!
//! ```rust
//! use petri_bdd::bdd::Bdd;
//! use petri_bdd::deadlock::detect_deadlock;
//! use petri_bdd::explicit::ExplicitExplorer;
//! use petri_bdd::marking::Marking;
//! use petri_bdd::net::NetBuilder;
//! use petri_bdd::symbolic::{SymbolicConfig, SymbolicEngine};
//!
//! let mut builder = NetBuilder::new();
//! builder.add_place("p1", None, 1)?;
//! builder.add_place("p2", None, 0)?;
//! builder.add_transition("t1", None)?;
//! builder.add_arc("p1", "t1", 1)?;
//! builder.add_arc("t1", "p2", 1)?;
//! let net = builder.finalize();
//!
//! // Explicit search:
//! let explicit = ExplicitExplorer::new(&net).bfs()?;
//!
//! // Symbolic search:
//! let bdd = Bdd::default();
//! let engine = SymbolicEngine::new(&bdd, &net, SymbolicConfig::default());
//! let symbolic = engine.reachable()?;
//! assert_eq!(symbolic.to_markings(), explicit);
//!
//! assert_eq!(detect_deadlock(&net, &symbolic)?, Some(Marking::new(vec![0, 1])));
//! # Ok::<(), petri_bdd::error::Error>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]** and **[`sat`]**: the BDD manager, quantification, renaming, model counting and enumeration.
//! - **[`net`]** and **[`marking`]**: the net model and its firing rule.
//! - **[`explicit`]**: breadth-first and depth-first enumeration.
//! - **[`symbolic`]**: fixed-point reachability with transition relations.
//! - **[`deadlock`]** and **[`optimize`]**: consumers of any [`ReachableSet`][crate::reachable::ReachableSet].
//! - **[`io`]**: JSON net descriptions.

pub mod bdd;
pub mod cache;
pub mod deadlock;
pub mod error;
pub mod explicit;
pub mod io;
pub mod marking;
pub mod net;
pub mod optimize;
pub mod reachable;
pub mod reference;
pub mod sat;
pub mod symbolic;
pub mod table;
pub mod utils;
