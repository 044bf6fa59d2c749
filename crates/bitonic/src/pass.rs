use std::iter::FusedIterator;

use crate::InvalidSizeError;

/// Largest buffer the network addresses with 32-bit root constants.
pub const MAX_SORT_LEN: usize = 1 << 31;

/// Parameters of one compare-and-swap pass, bound as two root constants.
///
/// - `increment` is the XOR distance between the two elements of a pair.
/// - `block_size` selects the direction: a pair whose lower index has the
///   `block_size` bit clear is ordered ascending, otherwise descending.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PassDescriptor {
    pub increment: u32,
    pub block_size: u32,
}

impl PassDescriptor {
    /// Indices of the pair owned by `thread`, lower index first.
    #[inline]
    pub fn pair_for_thread(self, thread: u32) -> (u32, u32) {
        let low = thread & (self.increment - 1);
        let lower = (thread << 1) - low;
        (lower, lower + self.increment)
    }

    #[inline]
    pub fn is_ascending(self, lower: u32) -> bool {
        lower & self.block_size == 0
    }
}

/// Ordered pass stream of the full bitonic network.
///
/// Stage `i` holds sub-passes `j = 0..=i` with `increment = 2^(i-j)` and
/// `block_size = 2^(i+1)`.
#[derive(Clone, Debug)]
pub struct PassSequence {
    stages: u32,
    stage: u32,
    sub_pass: u32,
    remaining: usize,
}

impl Iterator for PassSequence {
    type Item = PassDescriptor;

    fn next(&mut self) -> Option<PassDescriptor> {
        if self.stage >= self.stages {
            return None;
        }

        let pass = PassDescriptor {
            increment: 1 << (self.stage - self.sub_pass),
            block_size: 2 << self.stage,
        };

        if self.sub_pass == self.stage {
            self.stage += 1;
            self.sub_pass = 0;
        } else {
            self.sub_pass += 1;
        }
        self.remaining -= 1;
        Some(pass)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PassSequence {}

impl FusedIterator for PassSequence {}

/// `log2(len)` for a valid sort buffer length.
pub fn stage_count(len: usize) -> Result<u32, InvalidSizeError> {
    if !(2..=MAX_SORT_LEN).contains(&len) || !len.is_power_of_two() {
        return Err(InvalidSizeError { len });
    }
    Ok(len.trailing_zeros())
}

pub fn passes(len: usize) -> Result<PassSequence, InvalidSizeError> {
    let stages = stage_count(len)?;
    Ok(PassSequence {
        stages,
        stage: 0,
        sub_pass: 0,
        remaining: triangular(stages),
    })
}

pub fn pass_count(len: usize) -> Result<usize, InvalidSizeError> {
    stage_count(len).map(triangular)
}

#[inline]
fn triangular(stages: u32) -> usize {
    let l = stages as usize;
    l * (l + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_lengths() {
        for len in [0_usize, 1, 3, 6, 12, 1000, MAX_SORT_LEN + 1, MAX_SORT_LEN * 2] {
            assert_eq!(passes(len).unwrap_err(), InvalidSizeError { len });
            assert!(pass_count(len).is_err());
        }
    }

    #[test]
    fn count_is_triangular_in_stages() {
        for stages in 1..=31_u32 {
            let len = 1_usize << stages;
            let expected = (stages * (stages + 1) / 2) as usize;
            assert_eq!(pass_count(len).unwrap(), expected);
            assert_eq!(passes(len).unwrap().len(), expected);
        }
    }

    #[test]
    fn eight_element_sequence() {
        let got: Vec<_> = passes(8)
            .unwrap()
            .map(|p| (p.increment, p.block_size))
            .collect();
        assert_eq!(got, vec![(1, 2), (2, 4), (1, 4), (4, 8), (2, 8), (1, 8)]);
    }

    #[test]
    fn largest_sequence_ends_on_full_block() {
        let last = passes(MAX_SORT_LEN).unwrap().last().unwrap();
        assert_eq!(last.increment, 1);
        assert_eq!(last.block_size as usize, MAX_SORT_LEN);
    }

    #[test]
    fn pairs_cover_every_index_once() {
        let len = 64_u32;
        for pass in passes(len as usize).unwrap() {
            let mut seen = vec![false; len as usize];
            for thread in 0..len / 2 {
                let (a, b) = pass.pair_for_thread(thread);
                assert_eq!(a ^ b, pass.increment);
                assert!(!seen[a as usize] && !seen[b as usize]);
                seen[a as usize] = true;
                seen[b as usize] = true;
            }
            assert!(seen.into_iter().all(|s| s));
        }
    }
}
