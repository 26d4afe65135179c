//! Identifier sampling without replacement
//!
//! The catalog exposes records by sequential numeric identifier, with gaps.
//! A run explores a random subset of that space instead of walking it in order.

use crate::HarvestError;
use rand::seq::index;
use rand::Rng;

/// Draws `n` pairwise-distinct identifiers uniformly from `[min, max]`
///
/// The returned identifiers come in no particular order. Production callers pass
/// `rand::rng()`; tests pass a seeded `StdRng`.
///
/// # Errors
///
/// * `InvalidRange` - `min > max`
/// * `InvalidSampleSize` - `n` exceeds the number of identifiers in the range
///
/// # Example
///
/// ```
/// use catalog_harvest::sampler::sample_ids;
///
/// let ids = sample_ids(&mut rand::rng(), 40, 71332, 5).unwrap();
/// assert_eq!(ids.len(), 5);
/// assert!(ids.iter().all(|id| (40..=71332).contains(id)));
/// ```
pub fn sample_ids<R: Rng + ?Sized>(
    rng: &mut R,
    min: u64,
    max: u64,
    n: u64,
) -> Result<Vec<u64>, HarvestError> {
    if min > max {
        return Err(HarvestError::InvalidRange { min, max });
    }

    // Saturates for a range spanning all of u64.
    let available = (max - min).saturating_add(1);
    if n > available {
        return Err(HarvestError::InvalidSampleSize {
            requested: n,
            available,
        });
    }

    let length = usize::try_from(available).unwrap_or(usize::MAX);
    let amount = usize::try_from(n).map_err(|_| HarvestError::InvalidSampleSize {
        requested: n,
        available,
    })?;

    Ok(index::sample(rng, length, amount)
        .into_iter()
        .map(|offset| min + offset as u64)
        .collect())
}
