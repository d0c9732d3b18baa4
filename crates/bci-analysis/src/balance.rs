//! Seeded class balancing by downsampling to the minority class

use bci_core::{BciResult, TaskLabel};
use ndarray::{Array2, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeMap;

/// Downsample every class to the minority class's example count.
///
/// Majority classes keep a uniform random subset chosen with the supplied
/// seed; selected indices are re-sorted ascending so example order stays
/// stable. Group labels move in lock-step with the kept rows. Always seeded.
pub fn balance_classes(
    x: ArrayView2<'_, f32>,
    y: &[TaskLabel],
    groups: Option<&[usize]>,
    seed: u64,
) -> BciResult<(Array2<f32>, Vec<TaskLabel>, Option<Vec<usize>>)> {
    let mut by_class: BTreeMap<TaskLabel, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let min_count = by_class
        .values()
        .map(|indices| indices.len())
        .min()
        .unwrap_or(0);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut selected = Vec::with_capacity(min_count * by_class.len());
    for indices in by_class.values() {
        if indices.len() > min_count {
            let mut shuffled = indices.clone();
            shuffled.shuffle(&mut rng);
            selected.extend_from_slice(&shuffled[..min_count]);
        } else {
            selected.extend_from_slice(indices);
        }
    }
    selected.sort_unstable();

    let balanced_x = x.select(Axis(0), &selected);
    let balanced_y = selected.iter().map(|&i| y[i]).collect();
    let balanced_groups = groups.map(|g| selected.iter().map(|&i| g[i]).collect());

    Ok((balanced_x, balanced_y, balanced_groups))
}
