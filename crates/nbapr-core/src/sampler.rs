// Batched approximate weighted sampling without replacement.
//
// Multidimensional shifting: every trial draws one uniform value per element,
// the row is normalized to sum to 1, the (normalized) weights are subtracted,
// and the `sample_size` smallest shifted values are kept. Heavier elements
// are pushed further down and so are chosen more often, but never with
// certainty. All trials are drawn as one matrix.
//
// The kept indices are shuffled before they are returned. Callers split rows
// into teams by position, so the order within a row must carry no weight
// information.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ConfigurationError, DataShapeError, Result};

// ---------------------------------------------------------------------------
// Weight validation
// ---------------------------------------------------------------------------

/// Check that weights are finite, non-negative, and not all zero, and return
/// them scaled to sum to 1.
pub fn normalize_weights(weights: ArrayView1<f64>) -> Result<Array1<f64>> {
    for (index, &value) in weights.iter().enumerate() {
        if !value.is_finite() {
            return Err(ConfigurationError::NonFiniteWeight { index }.into());
        }
        if value < 0.0 {
            return Err(ConfigurationError::NegativeWeight { index, value }.into());
        }
    }
    let total = weights.sum();
    if total <= 0.0 {
        return Err(ConfigurationError::ZeroWeights.into());
    }
    Ok(weights.mapv(|w| w / total))
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Draw `num_samples` rows of `sample_size` distinct indices into
/// `0..weights.len()`, biased towards larger weights.
pub fn sample_indices<R: Rng + ?Sized>(
    num_samples: usize,
    sample_size: usize,
    weights: ArrayView1<f64>,
    rng: &mut R,
) -> Result<Array2<usize>> {
    let population = weights.len();
    if sample_size > population {
        return Err(ConfigurationError::SampleExceedsPopulation {
            sample_size,
            population,
        }
        .into());
    }
    let weights = normalize_weights(weights)?;

    let mut shifted = Array2::from_shape_simple_fn((num_samples, population), || rng.gen::<f64>());
    for mut row in shifted.axis_iter_mut(Axis(0)) {
        let total = row.sum().max(f64::MIN_POSITIVE);
        row /= total;
    }
    shifted -= &weights;

    let mut picks = Array2::<usize>::zeros((num_samples, sample_size));
    if sample_size == 0 {
        return Ok(picks);
    }

    let mut order: Vec<usize> = Vec::with_capacity(population);
    for (row, mut out) in shifted.axis_iter(Axis(0)).zip(picks.axis_iter_mut(Axis(0))) {
        order.clear();
        order.extend(0..population);
        if sample_size < population {
            // Partial ordering only: everything left of `sample_size` is
            // smaller than what is right of it.
            order.select_nth_unstable_by(sample_size, |&a, &b| {
                row[a].partial_cmp(&row[b]).unwrap_or(Ordering::Equal)
            });
        }
        let chosen = &mut order[..sample_size];
        chosen.shuffle(&mut *rng);
        for (slot, &idx) in out.iter_mut().zip(chosen.iter()) {
            *slot = idx;
        }
    }
    Ok(picks)
}

/// Like [`sample_indices`], but returns the sampled elements themselves.
pub fn sample<T: Clone, R: Rng + ?Sized>(
    elements: &[T],
    num_samples: usize,
    sample_size: usize,
    weights: ArrayView1<f64>,
    rng: &mut R,
) -> Result<Array2<T>> {
    if weights.len() != elements.len() {
        return Err(DataShapeError::ShapeMismatch {
            stage: "sampler weights",
            expected: vec![elements.len()],
            found: vec![weights.len()],
        }
        .into());
    }
    let picks = sample_indices(num_samples, sample_size, weights, rng)?;
    Ok(picks.mapv(|idx| elements[idx].clone()))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn rows_contain_distinct_indices() {
        let weights = Array1::from_elem(40, 1.0);
        let picks = sample_indices(500, 25, weights.view(), &mut rng()).unwrap();
        assert_eq!(picks.dim(), (500, 25));
        for row in picks.rows() {
            let unique: HashSet<usize> = row.iter().copied().collect();
            assert_eq!(unique.len(), 25);
            assert!(row.iter().all(|&i| i < 40));
        }
    }

    #[test]
    fn full_sample_returns_every_element_once() {
        let elements = ["a", "b", "c", "d", "e"];
        let weights = array![0.1, 0.4, 0.2, 0.2, 0.1];
        let picks = sample(&elements, 50, 5, weights.view(), &mut rng()).unwrap();
        for row in picks.rows() {
            let mut seen: Vec<&str> = row.iter().copied().collect();
            seen.sort_unstable();
            assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        }
    }

    #[test]
    fn full_sample_order_varies_between_rows() {
        let weights = Array1::from_elem(5, 1.0);
        let picks = sample_indices(50, 5, weights.view(), &mut rng()).unwrap();
        let orders: HashSet<Vec<usize>> = picks.rows().into_iter().map(|r| r.to_vec()).collect();
        assert!(orders.len() > 1, "every row came back in the same order");
    }

    #[test]
    fn position_in_row_is_independent_of_weight() {
        // The heaviest element must not favour the front of the row.
        let mut weights = Array1::from_elem(12, 1.0);
        weights[0] = 3.0;
        let picks = sample_indices(20_000, 6, weights.view(), &mut rng()).unwrap();
        let mut first_half = 0usize;
        let mut drafted = 0usize;
        for row in picks.rows() {
            if let Some(pos) = row.iter().position(|&i| i == 0) {
                drafted += 1;
                if pos < 3 {
                    first_half += 1;
                }
            }
        }
        let share = first_half as f64 / drafted as f64;
        assert!((share - 0.5).abs() < 0.03, "share={share}");
    }

    #[test]
    fn zero_sample_size_yields_empty_rows() {
        let weights = array![1.0, 1.0];
        let picks = sample_indices(3, 0, weights.view(), &mut rng()).unwrap();
        assert_eq!(picks.dim(), (3, 0));
    }

    #[test]
    fn heavier_weight_is_selected_more_often() {
        // Element 0 outweighs element 1, which outweighs the other 18.
        let mut weights = Array1::from_elem(20, 1.0);
        weights[0] = 1.5;
        weights[1] = 1.2;
        let picks = sample_indices(20_000, 5, weights.view(), &mut rng()).unwrap();
        let count = |target: usize| picks.iter().filter(|&&i| i == target).count() as f64;
        let heavy = count(0) / 20_000.0;
        let light = count(1) / 20_000.0;
        let baseline = count(10) / 20_000.0;
        assert!(heavy > light + 0.05, "heavy={heavy} light={light}");
        assert!(light > baseline, "light={light} baseline={baseline}");
        assert!(heavy < 1.0, "heaviest element must not be guaranteed");
    }

    #[test]
    fn zero_weight_elements_can_still_appear_when_needed() {
        // Three of four elements must be chosen, so at least one zero-weight
        // element is always drawn.
        let weights = array![1.0, 1.0, 0.0, 0.0];
        let picks = sample_indices(100, 3, weights.view(), &mut rng()).unwrap();
        for row in picks.rows() {
            assert!(row.iter().any(|&i| i >= 2));
        }
    }

    #[test]
    fn rejects_sample_larger_than_population() {
        let weights = array![1.0, 1.0];
        let err = sample_indices(1, 3, weights.view(), &mut rng()).unwrap_err();
        assert_eq!(
            err,
            SimulationError::Configuration(ConfigurationError::SampleExceedsPopulation {
                sample_size: 3,
                population: 2,
            })
        );
    }

    #[test]
    fn rejects_nan_weight() {
        let weights = array![1.0, f64::NAN, 1.0];
        let err = sample_indices(1, 1, weights.view(), &mut rng()).unwrap_err();
        assert_eq!(
            err,
            SimulationError::Configuration(ConfigurationError::NonFiniteWeight { index: 1 })
        );
    }

    #[test]
    fn rejects_all_zero_weights() {
        let weights = array![0.0, 0.0, 0.0];
        let err = sample_indices(1, 1, weights.view(), &mut rng()).unwrap_err();
        assert_eq!(err, SimulationError::Configuration(ConfigurationError::ZeroWeights));
    }

    #[test]
    fn rejects_negative_weights() {
        let weights = array![0.5, -0.1, 0.6];
        let err = sample_indices(1, 1, weights.view(), &mut rng()).unwrap_err();
        assert_eq!(
            err,
            SimulationError::Configuration(ConfigurationError::NegativeWeight {
                index: 1,
                value: -0.1,
            })
        );
    }

    #[test]
    fn rejects_mismatched_element_count() {
        let weights = array![1.0, 1.0];
        let err = sample(&[1, 2, 3], 1, 1, weights.view(), &mut rng()).unwrap_err();
        assert!(matches!(err, SimulationError::DataShape(_)));
    }

    #[test]
    fn same_seed_gives_same_draws() {
        let weights = Array1::from_elem(12, 1.0);
        let a = sample_indices(10, 4, weights.view(), &mut rng()).unwrap();
        let b = sample_indices(10, 4, weights.view(), &mut rng()).unwrap();
        assert_eq!(a, b);
    }
}
