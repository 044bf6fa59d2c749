use std::collections::HashSet;
use std::time::Instant;

use super::{BufferId, Command, ComputeDevice};
use crate::DeviceError;
use crate::kernel::{self, THREAD_GROUP_SIZE};
use crate::pass::PassDescriptor;
use crate::timing::TIMESTAMP_QUERY_COUNT;

/// Per-dimension cap on thread groups in a single dispatch.
pub const MAX_THREAD_GROUPS: u32 = 65_535;
pub const MAX_THREADS_PER_GROUP: u32 = 1024;

const TICKS_PER_SEC: u64 = 1_000_000_000;

/// Reference device that executes recorded work on the host.
///
/// Dispatches run the compare-and-swap kernel thread group by thread group
/// in submission order. With hazard validation on, a dispatch recorded
/// against a buffer that an earlier, unbarriered dispatch wrote is rejected.
#[derive(Debug)]
pub struct CpuDevice {
    name: String,
    thread_group_size: u32,
    validate_hazards: bool,
    buffers: Vec<Option<Vec<u32>>>,
    recorded: Vec<Command>,
    executed: Vec<Command>,
    unbarriered_writes: HashSet<BufferId>,
    dispatches_recorded: usize,
    timestamps: [Option<u64>; TIMESTAMP_QUERY_COUNT as usize],
    epoch: Instant,
    fence_value: u64,
    dispatches_until_removal: Option<usize>,
    removed: Option<String>,
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuDevice {
    pub fn new() -> Self {
        Self {
            name: "cpu-reference".to_string(),
            thread_group_size: THREAD_GROUP_SIZE,
            validate_hazards: true,
            buffers: Vec::new(),
            recorded: Vec::new(),
            executed: Vec::new(),
            unbarriered_writes: HashSet::new(),
            dispatches_recorded: 0,
            timestamps: [None; TIMESTAMP_QUERY_COUNT as usize],
            epoch: Instant::now(),
            fence_value: 0,
            dispatches_until_removal: None,
            removed: None,
        }
    }

    /// Clamped to `1..=MAX_THREADS_PER_GROUP`.
    pub fn with_thread_group_size(mut self, size: u32) -> Self {
        self.thread_group_size = size.clamp(1, MAX_THREADS_PER_GROUP);
        self
    }

    pub fn with_hazard_validation(mut self, enabled: bool) -> Self {
        self.validate_hazards = enabled;
        self
    }

    /// Simulates device removal once `count` dispatches have executed.
    pub fn remove_after_dispatches(mut self, count: usize) -> Self {
        self.dispatches_until_removal = Some(count);
        self
    }

    /// Commands executed by completed submissions, in execution order.
    pub fn command_log(&self) -> &[Command] {
        &self.executed
    }

    pub fn completed_fence_value(&self) -> u64 {
        self.fence_value
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    fn check_alive(&self) -> Result<(), DeviceError> {
        match &self.removed {
            Some(reason) => Err(DeviceError::DeviceRemoved(reason.clone())),
            None => Ok(()),
        }
    }

    fn check_buffer(&self, buffer: BufferId) -> Result<usize, DeviceError> {
        match self.buffers.get(buffer.0 as usize) {
            Some(Some(keys)) => Ok(keys.len()),
            _ => Err(DeviceError::UnknownBuffer(buffer)),
        }
    }

    fn execute(&mut self, command: Command) -> Result<(), DeviceError> {
        match command {
            Command::Barrier(_) => {}
            Command::Dispatch {
                buffer,
                pass,
                thread_groups,
            } => {
                if let Some(left) = self.dispatches_until_removal.as_mut() {
                    if *left == 0 {
                        let reason = format!("lost during dispatch on {buffer:?}");
                        self.removed = Some(reason.clone());
                        return Err(DeviceError::DeviceRemoved(reason));
                    }
                    *left -= 1;
                }
                let group_size = self.thread_group_size;
                let keys = self
                    .buffers
                    .get_mut(buffer.0 as usize)
                    .and_then(Option::as_mut)
                    .ok_or(DeviceError::UnknownBuffer(buffer))?;
                run_dispatch(keys, pass, thread_groups, group_size);
            }
            Command::Timestamp(slot) => {
                let ticks = self.epoch.elapsed().as_nanos() as u64;
                self.timestamps[slot as usize] = Some(ticks);
            }
        }
        self.executed.push(command);
        Ok(())
    }
}

fn run_dispatch(keys: &mut [u32], pass: PassDescriptor, thread_groups: u32, group_size: u32) {
    for group in 0..thread_groups {
        let base = group * group_size;
        for local in 0..group_size {
            kernel::compare_and_swap(keys, pass, base + local);
        }
    }
}

impl ComputeDevice for CpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn thread_group_size(&self) -> u32 {
        self.thread_group_size
    }

    fn create_buffer(&mut self, contents: &[u32]) -> Result<BufferId, DeviceError> {
        self.check_alive()?;
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(Some(contents.to_vec()));
        Ok(id)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
        self.unbarriered_writes.remove(&buffer);
    }

    fn uav_barrier(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        self.check_alive()?;
        self.check_buffer(buffer)?;
        self.unbarriered_writes.remove(&buffer);
        self.recorded.push(Command::Barrier(buffer));
        Ok(())
    }

    fn dispatch(
        &mut self,
        buffer: BufferId,
        pass: PassDescriptor,
        thread_groups: u32,
    ) -> Result<(), DeviceError> {
        self.check_alive()?;
        let len = self.check_buffer(buffer)?;
        // Both the pair distance and the direction block must lie inside the buffer.
        if pass.block_size as usize > len || 2 * pass.increment as usize > len {
            return Err(DeviceError::PassOutOfBounds {
                buffer,
                len,
                block_size: pass.block_size,
            });
        }
        if thread_groups > MAX_THREAD_GROUPS {
            return Err(DeviceError::DispatchTooLarge {
                groups: thread_groups,
                limit: MAX_THREAD_GROUPS,
            });
        }
        let dispatch = self.dispatches_recorded;
        if self.validate_hazards && !self.unbarriered_writes.insert(buffer) {
            return Err(DeviceError::Hazard { buffer, dispatch });
        }
        self.dispatches_recorded += 1;
        self.recorded.push(Command::Dispatch {
            buffer,
            pass,
            thread_groups,
        });
        Ok(())
    }

    fn write_timestamp(&mut self, slot: u32) -> Result<(), DeviceError> {
        self.check_alive()?;
        if slot >= TIMESTAMP_QUERY_COUNT {
            return Err(DeviceError::TimestampOutOfRange {
                slot,
                capacity: TIMESTAMP_QUERY_COUNT,
            });
        }
        self.recorded.push(Command::Timestamp(slot));
        Ok(())
    }

    fn discard_recorded(&mut self) {
        if !self.recorded.is_empty() {
            tracing::debug!(
                device = %self.name,
                commands = self.recorded.len(),
                "discarding recorded commands"
            );
        }
        self.recorded.clear();
        self.unbarriered_writes.clear();
        self.dispatches_recorded = 0;
    }

    fn submit_and_wait(&mut self) -> Result<(), DeviceError> {
        self.check_alive()?;
        let commands = std::mem::take(&mut self.recorded);
        self.unbarriered_writes.clear();
        self.dispatches_recorded = 0;
        tracing::debug!(
            device = %self.name,
            commands = commands.len(),
            "executing command list"
        );

        for command in commands {
            self.execute(command)?;
        }
        self.fence_value += 1;
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferId) -> Result<Vec<u32>, DeviceError> {
        self.check_alive()?;
        if self.recorded.iter().any(|c| c.touches(buffer)) {
            return Err(DeviceError::PendingWork(buffer));
        }
        self.buffers
            .get(buffer.0 as usize)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(DeviceError::UnknownBuffer(buffer))
    }

    fn resolve_timestamp(&self, slot: u32) -> Result<u64, DeviceError> {
        self.check_alive()?;
        let value = *self
            .timestamps
            .get(slot as usize)
            .ok_or(DeviceError::TimestampOutOfRange {
                slot,
                capacity: TIMESTAMP_QUERY_COUNT,
            })?;
        value.ok_or(DeviceError::TimestampMissing(slot))
    }

    fn timestamp_frequency(&self) -> u64 {
        TICKS_PER_SEC
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{BEGIN_SLOT, END_SLOT};

    const FIRST: PassDescriptor = PassDescriptor {
        increment: 1,
        block_size: 2,
    };

    #[test]
    fn work_runs_only_on_submit() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[2, 1]).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();

        assert_eq!(
            device.read_buffer(buffer).unwrap_err(),
            DeviceError::PendingWork(buffer)
        );
        assert!(device.command_log().is_empty());

        device.submit_and_wait().unwrap();
        assert_eq!(device.read_buffer(buffer).unwrap(), vec![1, 2]);
        assert_eq!(device.completed_fence_value(), 1);
        assert_eq!(device.command_log().len(), 1);
    }

    #[test]
    fn second_dispatch_without_barrier_is_a_hazard() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[4, 3, 2, 1]).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        assert_eq!(
            device.dispatch(buffer, FIRST, 1).unwrap_err(),
            DeviceError::Hazard {
                buffer,
                dispatch: 1
            }
        );

        device.uav_barrier(buffer).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
    }

    #[test]
    fn hazard_validation_can_be_disabled() {
        let mut device = CpuDevice::new().with_hazard_validation(false);
        let buffer = device.create_buffer(&[4, 3, 2, 1]).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.submit_and_wait().unwrap();
    }

    #[test]
    fn fence_wait_clears_hazards() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[4, 3, 2, 1]).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.submit_and_wait().unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
    }

    #[test]
    fn rejects_oversized_dispatch() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[0, 0]).unwrap();
        assert_eq!(
            device.dispatch(buffer, FIRST, MAX_THREAD_GROUPS + 1).unwrap_err(),
            DeviceError::DispatchTooLarge {
                groups: MAX_THREAD_GROUPS + 1,
                limit: MAX_THREAD_GROUPS
            }
        );
    }

    #[test]
    fn rejects_pass_larger_than_buffer() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[4, 3, 2, 1]).unwrap();
        let pass = PassDescriptor {
            increment: 4,
            block_size: 8,
        };
        assert_eq!(
            device.dispatch(buffer, pass, 1).unwrap_err(),
            DeviceError::PassOutOfBounds {
                buffer,
                len: 4,
                block_size: 8
            }
        );
        device.submit_and_wait().unwrap();
        assert!(device.command_log().is_empty());
        assert_eq!(device.read_buffer(buffer).unwrap(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn discarded_work_never_runs() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[2, 1]).unwrap();
        device.write_timestamp(BEGIN_SLOT).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.discard_recorded();

        assert_eq!(device.read_buffer(buffer).unwrap(), vec![2, 1]);
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.submit_and_wait().unwrap();
        assert_eq!(
            device.command_log(),
            &[Command::Dispatch {
                buffer,
                pass: FIRST,
                thread_groups: 1
            }]
        );
        assert_eq!(device.read_buffer(buffer).unwrap(), vec![1, 2]);
    }

    #[test]
    fn unknown_and_released_buffers() {
        let mut device = CpuDevice::new();
        let buffer = device.create_buffer(&[1, 2]).unwrap();
        device.release_buffer(buffer);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(
            device.read_buffer(buffer).unwrap_err(),
            DeviceError::UnknownBuffer(buffer)
        );
        assert_eq!(
            device.uav_barrier(BufferId(7)).unwrap_err(),
            DeviceError::UnknownBuffer(BufferId(7))
        );
    }

    #[test]
    fn timestamps_are_ordered() {
        let mut device = CpuDevice::new();
        assert_eq!(
            device.resolve_timestamp(BEGIN_SLOT).unwrap_err(),
            DeviceError::TimestampMissing(BEGIN_SLOT)
        );
        assert!(device.write_timestamp(TIMESTAMP_QUERY_COUNT).is_err());

        let buffer = device.create_buffer(&[9, 8, 7, 6]).unwrap();
        device.write_timestamp(BEGIN_SLOT).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.write_timestamp(END_SLOT).unwrap();
        device.submit_and_wait().unwrap();

        let begin = device.resolve_timestamp(BEGIN_SLOT).unwrap();
        let end = device.resolve_timestamp(END_SLOT).unwrap();
        assert!(begin <= end);
    }

    #[test]
    fn removal_is_sticky() {
        let mut device = CpuDevice::new().remove_after_dispatches(1);
        let buffer = device.create_buffer(&[4, 3, 2, 1]).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();
        device.uav_barrier(buffer).unwrap();
        device.dispatch(buffer, FIRST, 1).unwrap();

        assert!(matches!(
            device.submit_and_wait(),
            Err(DeviceError::DeviceRemoved(_))
        ));
        assert!(matches!(
            device.read_buffer(buffer),
            Err(DeviceError::DeviceRemoved(_))
        ));
        assert!(matches!(
            device.create_buffer(&[1, 2]),
            Err(DeviceError::DeviceRemoved(_))
        ));
    }

    #[test]
    fn partial_last_group() {
        let mut device = CpuDevice::new().with_thread_group_size(3);
        let buffer = device.create_buffer(&[8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        device.dispatch(buffer, FIRST, 2).unwrap();
        device.submit_and_wait().unwrap();
        assert_eq!(
            device.read_buffer(buffer).unwrap(),
            vec![7, 8, 6, 5, 3, 4, 2, 1]
        );
    }
}
