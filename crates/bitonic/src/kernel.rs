//! Host rendition of the compare-and-swap compute kernel.

use crate::InvalidSizeError;
use crate::pass::{PassDescriptor, passes, stage_count};

/// Threads per group declared by the kernel.
pub const THREAD_GROUP_SIZE: u32 = 256;

/// One kernel invocation. Threads past the last pair return without touching
/// the buffer, so the final group may be partially populated. A pair that
/// reaches past the end of `keys` is dropped the way out-of-bounds UAV writes
/// are.
#[inline]
pub fn compare_and_swap(keys: &mut [u32], pass: PassDescriptor, thread: u32) {
    if thread as usize >= keys.len() / 2 {
        return;
    }

    let (lower, upper) = pass.pair_for_thread(thread);
    let (lower, upper) = (lower as usize, upper as usize);
    if upper >= keys.len() {
        return;
    }
    let a = keys[lower];
    let b = keys[upper];

    let out_of_order = if pass.is_ascending(lower as u32) {
        a > b
    } else {
        a < b
    };
    if out_of_order {
        keys[lower] = b;
        keys[upper] = a;
    }
}

pub fn run_pass(keys: &mut [u32], pass: PassDescriptor) {
    let pairs = (keys.len() / 2) as u32;
    for thread in 0..pairs {
        compare_and_swap(keys, pass, thread);
    }
}

/// Runs the whole network over `keys` on the host.
pub fn sort_in_place(keys: &mut [u32]) -> Result<(), InvalidSizeError> {
    for pass in passes(keys.len())? {
        run_pass(keys, pass);
    }
    Ok(())
}

/// Thread groups needed to cover the `len / 2` pairs of one pass.
#[inline]
pub fn thread_groups(len: usize, group_size: u32) -> u32 {
    let pairs = (len / 2) as u64;
    pairs.div_ceil(group_size.max(1) as u64) as u32
}

/// Checks that after `stage` completed stages the buffer is made of
/// alternating ascending/descending runs of `2^(stage + 1)` keys.
pub fn is_stage_complete(keys: &[u32], stage: u32) -> Result<bool, InvalidSizeError> {
    let stages = stage_count(keys.len())?;
    let run = 2_usize << stage.min(stages - 1);
    Ok(keys.chunks(run).enumerate().all(|(block, chunk)| {
        if stage + 1 >= stages || block % 2 == 0 {
            chunk.windows(2).all(|w| w[0] <= w[1])
        } else {
            chunk.windows(2).all(|w| w[0] >= w[1])
        }
    }))
}
