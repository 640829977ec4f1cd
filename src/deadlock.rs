//! Deadlock detection over a reachable set.
//!
//! A marking is dead when it enables no transition.

use log::info;

use crate::error::Result;
use crate::marking::Marking;
use crate::net::Net;
use crate::reachable::ReachableSet;

/// First marking of `states`, in canonical order, that enables no transition of `net`.
///
/// For symbolic sets, [`SymbolicEngine::find_deadlock`][crate::symbolic::SymbolicEngine::find_deadlock]
/// answers the same question without enumerating the markings.
pub fn detect_deadlock<S>(net: &Net, states: &S) -> Result<Option<Marking>>
where
    S: ReachableSet + ?Sized,
{
    for marking in states.markings() {
        if net.is_deadlock(&marking)? {
            info!("Deadlock at {}", marking);
            return Ok(Some(marking));
        }
    }
    info!("No deadlock");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use test_log::test;

    use super::*;
    use crate::error::Error;
    use crate::explicit::ExplicitExplorer;
    use crate::net::NetBuilder;

    /// Two philosophers, two forks, each takes the left fork first.
    fn philosophers() -> Net {
        let mut builder = NetBuilder::new();
        for i in 0..2 {
            builder.add_place(&format!("think{}", i), None, 1).unwrap();
            builder.add_place(&format!("fork{}", i), None, 1).unwrap();
            builder.add_place(&format!("left{}", i), None, 0).unwrap();
            builder.add_place(&format!("eat{}", i), None, 0).unwrap();
        }
        for i in 0..2 {
            let left = format!("fork{}", i);
            let right = format!("fork{}", (i + 1) % 2);
            let take_left = format!("takeleft{}", i);
            let take_right = format!("takeright{}", i);
            let release = format!("release{}", i);
            builder.add_transition(&take_left, None).unwrap();
            builder.add_transition(&take_right, None).unwrap();
            builder.add_transition(&release, None).unwrap();

            builder.add_arc(&format!("think{}", i), &take_left, 1).unwrap();
            builder.add_arc(&left, &take_left, 1).unwrap();
            builder.add_arc(&take_left, &format!("left{}", i), 1).unwrap();

            builder.add_arc(&format!("left{}", i), &take_right, 1).unwrap();
            builder.add_arc(&right, &take_right, 1).unwrap();
            builder.add_arc(&take_right, &format!("eat{}", i), 1).unwrap();

            builder.add_arc(&format!("eat{}", i), &release, 1).unwrap();
            builder.add_arc(&release, &format!("think{}", i), 1).unwrap();
            builder.add_arc(&release, &left, 1).unwrap();
            builder.add_arc(&release, &right, 1).unwrap();
        }
        builder.finalize()
    }

    #[test]
    fn test_simple_deadlock() {
        let mut builder = NetBuilder::new();
        builder.add_place("p1", None, 1).unwrap();
        builder.add_place("p2", None, 0).unwrap();
        builder.add_transition("t1", None).unwrap();
        builder.add_arc("p1", "t1", 1).unwrap();
        builder.add_arc("t1", "p2", 1).unwrap();
        let net = builder.finalize();

        let states = ExplicitExplorer::new(&net).bfs().unwrap();
        assert_eq!(detect_deadlock(&net, &states), Ok(Some(Marking::new(vec![0, 1]))));
    }

    #[test]
    fn test_philosophers() {
        let net = philosophers();
        let states = ExplicitExplorer::new(&net).bfs().unwrap();

        let deadlock = detect_deadlock(&net, &states).unwrap().unwrap();
        assert!(states.contains(&deadlock));
        assert!(net.enabled_transitions(&deadlock).unwrap().is_empty());

        // Both philosophers hold their left fork.
        let left0 = net.place_index("left0").unwrap();
        let left1 = net.place_index("left1").unwrap();
        assert!(deadlock.is_marked(left0) && deadlock.is_marked(left1));

        // The first one in canonical order.
        let first = states
            .iter()
            .find(|m| net.is_deadlock(m).unwrap())
            .cloned();
        assert_eq!(Some(deadlock), first);
    }

    #[test]
    fn test_no_deadlock() {
        let mut builder = NetBuilder::new();
        builder.add_place("a", None, 1).unwrap();
        builder.add_place("b", None, 0).unwrap();
        builder.add_transition("f", None).unwrap();
        builder.add_transition("g", None).unwrap();
        builder.add_arc("a", "f", 1).unwrap();
        builder.add_arc("f", "b", 1).unwrap();
        builder.add_arc("b", "g", 1).unwrap();
        builder.add_arc("g", "a", 1).unwrap();
        let net = builder.finalize();

        let states = ExplicitExplorer::new(&net).bfs().unwrap();
        assert_eq!(detect_deadlock(&net, &states), Ok(None));
        assert_eq!(detect_deadlock(&net, &BTreeSet::new()), Ok(None));
    }

    #[test]
    fn test_wrong_marking_length() {
        let net = philosophers();
        let states = BTreeSet::from([Marking::new(vec![1, 0])]);
        assert_eq!(
            detect_deadlock(&net, &states),
            Err(Error::MarkingLength {
                expected: 8,
                actual: 2
            })
        );
    }
}
