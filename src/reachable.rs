//! Common view over explicit and symbolic reachable sets.

use std::collections::BTreeSet;

use num_bigint::BigUint;

use crate::marking::Marking;

/// A finite set of markings.
///
/// [`markings`][ReachableSet::markings] yields every member exactly once,
/// in canonical (lexicographic) order.
pub trait ReachableSet {
    fn markings(&self) -> Box<dyn Iterator<Item = Marking> + '_>;

    fn contains(&self, marking: &Marking) -> bool;

    fn num_markings(&self) -> BigUint;

    fn is_empty(&self) -> bool {
        self.markings().next().is_none()
    }
}

impl ReachableSet for BTreeSet<Marking> {
    fn markings(&self) -> Box<dyn Iterator<Item = Marking> + '_> {
        Box::new(self.iter().cloned())
    }

    fn contains(&self, marking: &Marking) -> bool {
        BTreeSet::contains(self, marking)
    }

    fn num_markings(&self) -> BigUint {
        BigUint::from(self.len())
    }

    fn is_empty(&self) -> bool {
        BTreeSet::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_btree_set() {
        let set = BTreeSet::from([Marking::new(vec![1, 0]), Marking::new(vec![0, 1])]);
        let all: Vec<Marking> = ReachableSet::markings(&set).collect();
        assert_eq!(all, vec![Marking::new(vec![0, 1]), Marking::new(vec![1, 0])]);
        assert!(ReachableSet::contains(&set, &Marking::new(vec![1, 0])));
        assert!(!ReachableSet::contains(&set, &Marking::new(vec![1, 1])));
        assert_eq!(set.num_markings(), BigUint::from(2u32));
        assert!(!ReachableSet::is_empty(&set));
        assert!(ReachableSet::is_empty(&BTreeSet::<Marking>::new()));
    }
}
