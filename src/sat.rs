//! Model counting and model enumeration.
//!
//! Assignments are reported over an explicit, ascending list of variables,
//! as `Vec<bool>` values aligned with that list. Enumeration follows the
//! lexicographic order with `false < true`, so the first assignment is also
//! the smallest one.

use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Number of satisfying assignments of `node` over the variables `1..=num_vars`.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let low = self.low(node.index());
        let high = self.high(node.index());

        let count_low = self.sat_count_(low, max, cache);
        let count_high = self.sat_count_(high, max, cache);

        let count: BigUint = (count_low + count_high) >> 1;
        let count = if node.is_negated() { max - count } else { count };

        cache.insert(node, count.clone());
        count
    }

    /// Lexicographically smallest satisfying assignment of `node` over `vars`.
    ///
    /// `vars` must be sorted ascending and cover the support of `node`.
    /// Returns `None` if `node` is the constant false.
    ///
    /// # Panics
    ///
    /// Panics if `node` depends on a variable missing from `vars`.
    pub fn min_sat(&self, node: Ref, vars: &[u32]) -> Option<Vec<bool>> {
        if self.is_zero(node) {
            return None;
        }

        let mut assignment = Vec::with_capacity(vars.len());
        let mut current = node;

        for &v in vars {
            let (low, high) = self.top_cofactors(current, v);
            // Every non-zero node is satisfiable, so the low branch wins whenever possible.
            if !self.is_zero(low) {
                assignment.push(false);
                current = low;
            } else {
                assignment.push(true);
                current = high;
            }
        }

        assert!(self.is_one(current), "Assignment does not cover the support");
        Some(assignment)
    }

    /// Iterator over all satisfying assignments of `node` over `vars`,
    /// in ascending lexicographic order.
    ///
    /// `vars` must be sorted ascending and cover the support of `node`.
    ///
    /// # Examples
    ///
    /// ```
    /// use petri_bdd::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let f = bdd.apply_or(bdd.mk_var(1), bdd.mk_var(2));
    ///
    /// let all: Vec<_> = bdd.assignments(f, &[1, 2]).collect();
    /// assert_eq!(all, vec![vec![false, true], vec![true, false], vec![true, true]]);
    /// ```
    pub fn assignments(&self, node: Ref, vars: &[u32]) -> Assignments<'_> {
        Assignments::new(self, node, vars.to_vec())
    }
}

/// Depth-first enumeration with an explicit stack.
pub struct Assignments<'a> {
    bdd: &'a Bdd,
    vars: Vec<u32>,
    stack: Vec<(Ref, Vec<bool>)>,
}

impl<'a> Assignments<'a> {
    fn new(bdd: &'a Bdd, node: Ref, vars: Vec<u32>) -> Self {
        let mut stack = Vec::new();
        if !bdd.is_zero(node) {
            stack.push((node, Vec::with_capacity(vars.len())));
        }
        Self { bdd, vars, stack }
    }
}

impl Iterator for Assignments<'_> {
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, partial)) = self.stack.pop() {
            if self.bdd.is_zero(node) {
                continue;
            }

            let depth = partial.len();
            if depth == self.vars.len() {
                return Some(partial);
            }

            let (low, high) = self.bdd.top_cofactors(node, self.vars[depth]);

            // Low is pushed last, so it is explored first.
            if !self.bdd.is_zero(high) {
                let mut next = partial.clone();
                next.push(true);
                self.stack.push((high, next));
            }
            if !self.bdd.is_zero(low) {
                let mut next = partial;
                next.push(false);
                self.stack.push((low, next));
            }
        }
        None
    }
}
