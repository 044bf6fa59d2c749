use std::time::Duration;

use crate::SortError;
use crate::buffer::SortBuffer;
use crate::device::{BufferId, ComputeDevice};
use crate::kernel::thread_groups;
use crate::pass::passes;
use crate::timing::{BEGIN_SLOT, END_SLOT, ticks_to_duration};

/// Result of one sort.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortReport {
    /// The real keys, ascending. Padding is not included.
    pub keys: Vec<u32>,
    pub padded_len: usize,
    pub passes: usize,
    pub thread_groups_per_pass: u32,
    /// Device time between the first and last pass when profiling is enabled.
    pub device_time: Option<Duration>,
}

/// Drives the bitonic pass sequence on a [`ComputeDevice`].
///
/// All passes are recorded back to back, separated by hazard barriers, and
/// submitted with a single host wait at the end.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitonicSorter {
    profile: bool,
}

impl BitonicSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brackets the pass stream with timestamps.
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile = enabled;
        self
    }

    pub fn sort<D>(&self, device: &mut D, keys: &[u32]) -> Result<SortReport, SortError>
    where
        D: ComputeDevice + ?Sized,
    {
        let buffer = SortBuffer::from_keys(keys)?;
        let padded_len = buffer.padded_len();
        let real_len = buffer.real_len();
        let id = device.create_buffer(buffer.as_slice())?;

        let result = self.sort_uploaded(device, id, padded_len, real_len);
        if result.is_err() {
            device.discard_recorded();
        }
        device.release_buffer(id);
        let (sorted, passes, device_time) = result?;

        tracing::info!(
            device = device.name(),
            keys = real_len,
            padded_len,
            passes,
            ?device_time,
            "bitonic sort complete"
        );

        Ok(SortReport {
            keys: sorted.into_keys(),
            padded_len,
            passes,
            thread_groups_per_pass: thread_groups(padded_len, device.thread_group_size()),
            device_time,
        })
    }

    fn sort_uploaded<D>(
        &self,
        device: &mut D,
        id: BufferId,
        padded_len: usize,
        real_len: usize,
    ) -> Result<(SortBuffer, usize, Option<Duration>), SortError>
    where
        D: ComputeDevice + ?Sized,
    {
        if self.profile {
            device.write_timestamp(BEGIN_SLOT)?;
        }
        let recorded = self.encode_passes(device, id, padded_len)?;
        if self.profile {
            device.write_timestamp(END_SLOT)?;
        }

        device.submit_and_wait()?;
        let keys = device.read_buffer(id)?;

        let device_time = if self.profile {
            let begin = device.resolve_timestamp(BEGIN_SLOT)?;
            let end = device.resolve_timestamp(END_SLOT)?;
            ticks_to_duration(begin, end, device.timestamp_frequency())
        } else {
            None
        };

        Ok((
            SortBuffer::from_readback(keys, real_len),
            recorded,
            device_time,
        ))
    }

    /// Records the full pass stream for a buffer of `padded_len` keys already
    /// resident on the device. A barrier precedes every pass but the first.
    /// Nothing is submitted.
    pub fn encode_passes<D>(
        &self,
        device: &mut D,
        buffer: BufferId,
        padded_len: usize,
    ) -> Result<usize, SortError>
    where
        D: ComputeDevice + ?Sized,
    {
        let sequence = passes(padded_len)?;
        let groups = thread_groups(padded_len, device.thread_group_size());
        let count = sequence.len();

        for (index, pass) in sequence.enumerate() {
            if index > 0 {
                device.uav_barrier(buffer)?;
            }
            device.dispatch(buffer, pass, groups)?;
        }
        Ok(count)
    }
}
