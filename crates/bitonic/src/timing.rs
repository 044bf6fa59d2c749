use std::time::Duration;

/// Slots in the timestamp heap: one before the first pass, one after the last.
pub const TIMESTAMP_QUERY_COUNT: u32 = 2;
pub const BEGIN_SLOT: u32 = 0;
pub const END_SLOT: u32 = 1;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Converts a pair of resolved timestamps into wall time.
///
/// Returns `None` when the counter went backwards or the frequency is zero.
pub fn ticks_to_duration(begin: u64, end: u64, frequency: u64) -> Option<Duration> {
    if frequency == 0 || end < begin {
        return None;
    }
    let nanos = (end - begin) as u128 * NANOS_PER_SEC / frequency as u128;
    Some(Duration::from_nanos(u64::try_from(nanos).ok()?))
}
