//! Uniform random selection of users for segment enrollment.
use rand::seq::index;

/// Number of users a segment at `percent` receives from `population`
/// distinct users: `floor(population * percent / 100)`.
pub fn sample_size(population: usize, percent: i32) -> usize {
    population * percent.clamp(0, 100) as usize / 100
}

/// Picks `sample_size` users uniformly at random, without replacement.
///
/// `users` must already be deduplicated; both store backends feed this from
/// a distinct scan. Order of the returned sample is unspecified.
pub fn select_sample(users: &[i64], percent: i32) -> Vec<i64> {
    let count = sample_size(users.len(), percent);
    if count == 0 {
        return Vec::new();
    }
    let mut rng = rand::thread_rng();
    index::sample(&mut rng, users.len(), count)
        .into_iter()
        .map(|idx| users[idx])
        .collect()
}
