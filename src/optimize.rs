//! Linear objectives over a reachable set.

use log::info;

use crate::error::{Error, Result};
use crate::marking::Marking;
use crate::net::Net;
use crate::reachable::ReachableSet;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Objective {
    #[default]
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub marking: Marking,
    pub value: f64,
}

/// `Σ weights[i] * marking[i]`.
pub fn objective_value(weights: &[f64], marking: &Marking) -> f64 {
    weights
        .iter()
        .zip(marking.tokens())
        .map(|(&w, &t)| w * t as f64)
        .sum()
}

/// Extremize the weighted token sum over `states`.
///
/// Ties go to the first optimal marking in canonical order.
/// Returns `None` if `states` is empty.
pub fn optimize<S>(net: &Net, states: &S, weights: &[f64], objective: Objective) -> Result<Option<Optimum>>
where
    S: ReachableSet + ?Sized,
{
    if weights.len() != net.num_places() {
        return Err(Error::WeightLength {
            expected: net.num_places(),
            actual: weights.len(),
        });
    }

    let mut best: Option<Optimum> = None;
    for marking in states.markings() {
        let value = objective_value(weights, &marking);
        let better = match &best {
            None => true,
            Some(current) => match objective {
                Objective::Maximize => value > current.value,
                Objective::Minimize => value < current.value,
            },
        };
        if better {
            best = Some(Optimum { marking, value });
        }
    }

    if let Some(optimum) = &best {
        info!("{:?} objective: {} at {}", objective, optimum.value, optimum.marking);
    }
    Ok(best)
}
