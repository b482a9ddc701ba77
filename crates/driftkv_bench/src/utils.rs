//! Data generators shared by the benchmarks.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates `count` key-value pairs with keys of `key_len` and values of
/// `value_len` alphanumeric characters. Seeded for reproducibility.
#[must_use]
pub fn generate_pairs(count: usize, key_len: usize, value_len: usize) -> Vec<(String, String)> {
    let mut rng = StdRng::seed_from_u64(42);

    (0..count)
        .map(|i| {
            let key = format!("{}-{i}", random_string(&mut rng, key_len));
            let value = random_string(&mut rng, value_len);
            (key, value)
        })
        .collect()
}

fn random_string(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
