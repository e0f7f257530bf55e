//! Deterministic train/validation subject splitting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Split subjects into (train, validation) sets.
///
/// The shuffle is driven entirely by `seed`, so the same subject list,
/// fraction, and seed always produce the same split across runs and
/// machines. The validation set takes `round(len * fraction)` subjects.
pub fn split_subjects(
    subjects: &[String],
    fraction: f32,
    seed: u64,
) -> (Vec<String>, Vec<String>) {
    let mut order: Vec<usize> = (0..subjects.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let val_count = (subjects.len() as f32 * fraction).round() as usize;
    let (val_idx, train_idx) = order.split_at(val_count.min(order.len()));

    let mut train: Vec<String> = train_idx.iter().map(|&i| subjects[i].clone()).collect();
    let mut val: Vec<String> = val_idx.iter().map(|&i| subjects[i].clone()).collect();
    train.sort();
    val.sort();

    (train, val)
}
