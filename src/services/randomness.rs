#[cfg(test)]
use std::sync::{Mutex, PoisonError};

#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};
use rand::seq::{index, SliceRandom};

/// Source of randomness for question sampling and answer option order.
pub(crate) trait RandomSource: Send + Sync {
    /// `amount` distinct indices drawn uniformly from `0..len` without replacement.
    /// Returns at most `len` indices.
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize>;

    /// A uniformly random ordering of `0..len`.
    fn permutation(&self, len: usize) -> Vec<usize>;
}

/// Production source backed by the thread-local generator.
pub(crate) struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut rand::thread_rng(), len, amount.min(len)).into_vec()
    }

    fn permutation(&self, len: usize) -> Vec<usize> {
        let mut order = (0..len).collect::<Vec<_>>();
        order.shuffle(&mut rand::thread_rng());
        order
    }
}

/// Reproducible source for tests.
#[cfg(test)]
pub(crate) struct SeededRandom {
    rng: Mutex<StdRng>,
}

#[cfg(test)]
impl SeededRandom {
    pub(crate) fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

#[cfg(test)]
impl RandomSource for SeededRandom {
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        index::sample(&mut *rng, len, amount.min(len)).into_vec()
    }

    fn permutation(&self, len: usize) -> Vec<usize> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut order = (0..len).collect::<Vec<_>>();
        order.shuffle(&mut *rng);
        order
    }
}

/// Picks `amount` distinct items (or all of them when the population is smaller),
/// in random order.
pub(crate) fn sample<T: Clone>(source: &dyn RandomSource, population: &[T], amount: usize) -> Vec<T> {
    source
        .sample_indices(population.len(), amount)
        .into_iter()
        .filter_map(|index| population.get(index).cloned())
        .collect()
}

pub(crate) fn shuffle<T>(source: &dyn RandomSource, items: Vec<T>) -> Vec<T> {
    let order = source.permutation(items.len());
    let mut slots = items.into_iter().map(Some).collect::<Vec<_>>();
    order.into_iter().filter_map(|index| slots.get_mut(index).and_then(Option::take)).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;

    fn pool(size: usize) -> Vec<String> {
        (0..size).map(|i| format!("q{i}")).collect()
    }

    #[test]
    fn sample_draws_exactly_amount_distinct_items_from_pool() {
        let source = SeededRandom::new(7);
        let population = pool(10);

        for _ in 0..50 {
            let picked = sample(&source, &population, 4);
            assert_eq!(picked.len(), 4);
            let distinct = picked.iter().collect::<BTreeSet<_>>();
            assert_eq!(distinct.len(), 4);
            assert!(picked.iter().all(|item| population.contains(item)));
        }
    }

    #[test]
    fn sample_returns_whole_pool_when_amount_exceeds_it() {
        let source = SeededRandom::new(11);
        let population = pool(3);

        let picked = sample(&source, &population, 5);
        let picked = picked.into_iter().collect::<BTreeSet<_>>();
        let expected = population.into_iter().collect::<BTreeSet<_>>();
        assert_eq!(picked, expected);
    }

    #[test]
    fn sample_of_empty_pool_is_empty() {
        let source = ThreadRandom;
        assert!(sample::<String>(&source, &[], 3).is_empty());
    }

    #[test]
    fn sample_is_roughly_uniform() {
        let source = SeededRandom::new(42);
        let population = pool(4);
        let trials = 4000;
        let mut counts = HashMap::new();

        for _ in 0..trials {
            for item in sample(&source, &population, 2) {
                *counts.entry(item).or_insert(0usize) += 1;
            }
        }

        // Each item is expected in half the draws.
        let expected = trials / 2;
        for item in &population {
            let count = counts.get(item).copied().unwrap_or_default();
            assert!(
                count.abs_diff(expected) < expected / 10,
                "{item} drawn {count} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn same_seed_gives_same_sample() {
        let population = pool(20);
        let first = sample(&SeededRandom::new(3), &population, 5);
        let second = sample(&SeededRandom::new(3), &population, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn shuffle_keeps_every_item() {
        let source = SeededRandom::new(5);
        let items = pool(8);

        let shuffled = shuffle(&source, items.clone());
        assert_eq!(shuffled.len(), items.len());
        let mut sorted = shuffled;
        sorted.sort();
        let mut expected = items;
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn thread_random_permutation_covers_range() {
        let mut order = ThreadRandom.permutation(6);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }
}
