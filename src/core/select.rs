/// Weighted random selection among rules and choice branches.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::core::grammar::Rule;

/// Anything with a non-negative selection weight.
pub trait Weighted {
    fn weight(&self) -> f64;
}

impl Weighted for Rule {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl<T> Weighted for (f64, T) {
    fn weight(&self) -> f64 {
        self.0
    }
}

/// Pick one item with probability proportional to its weight.
///
/// Draws uniformly from `[0, total)` and returns the item whose cumulative
/// interval contains the draw, so zero-weight items are never picked.
/// Returns `None` when no item has a positive finite weight.
pub fn select<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    // Scaled by the largest weight so the total cannot overflow.
    let max = items.iter().map(Weighted::weight).fold(0.0, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return None;
    }
    let dist = WeightedIndex::new(items.iter().map(|item| item.weight() / max)).ok()?;
    Some(&items[dist.sample(rng)])
}
