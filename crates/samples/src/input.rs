use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyDistribution {
    /// A permutation of distinct keys.
    #[default]
    Shuffled,
    /// Independent uniform keys; duplicates are possible.
    Uniform,
}

impl KeyDistribution {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shuffled => "shuffled",
            Self::Uniform => "uniform",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputError {
    #[error("{count} distinct keys do not fit in u32")]
    TooManyDistinctKeys { count: usize },
}

pub fn generate_keys(
    count: usize,
    seed: u64,
    distribution: KeyDistribution,
) -> Result<Vec<u32>, InputError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let keys = match distribution {
        KeyDistribution::Shuffled => {
            let last =
                u32::try_from(count).map_err(|_| InputError::TooManyDistinctKeys { count })?;
            let mut keys: Vec<u32> = (1..=last).collect();
            keys.shuffle(&mut rng);
            keys
        }
        KeyDistribution::Uniform => (0..count).map(|_| rng.random::<u32>()).collect(),
    };
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn shuffled_keys_are_distinct() {
        let keys = generate_keys(1000, 7, KeyDistribution::Shuffled).unwrap();
        assert_eq!(keys.len(), 1000);
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 1000);
        assert!(keys.iter().all(|&k| (1..=1000).contains(&k)));
    }

    #[test]
    fn generation_is_deterministic() {
        for dist in [KeyDistribution::Shuffled, KeyDistribution::Uniform] {
            assert_eq!(generate_keys(64, 42, dist), generate_keys(64, 42, dist));
            assert_ne!(generate_keys(64, 42, dist), generate_keys(64, 43, dist));
        }
    }

    #[test]
    fn empty_shuffle() {
        assert_eq!(generate_keys(0, 1, KeyDistribution::Shuffled), Ok(Vec::new()));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn shuffled_count_must_fit_in_u32() {
        let count = u32::MAX as usize + 1;
        assert_eq!(
            generate_keys(count, 7, KeyDistribution::Shuffled),
            Err(InputError::TooManyDistinctKeys { count })
        );
    }
}
