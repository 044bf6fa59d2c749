//! The GPU collaborator the sorter drives.
//!
//! Work is recorded into a command list and only runs on
//! [`ComputeDevice::submit_and_wait`], which signals a fence and blocks the
//! host until it completes. Between dispatches touching the same buffer the
//! caller records a [`ComputeDevice::uav_barrier`]; the device gives no
//! ordering guarantee otherwise.

mod cpu;

pub use cpu::CpuDevice;

use crate::DeviceError;
use crate::pass::PassDescriptor;

/// Handle to a device-resident key buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// A recorded command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Barrier(BufferId),
    Dispatch {
        buffer: BufferId,
        pass: PassDescriptor,
        thread_groups: u32,
    },
    Timestamp(u32),
}

impl Command {
    pub fn touches(&self, buffer: BufferId) -> bool {
        match *self {
            Command::Barrier(b) => b == buffer,
            Command::Dispatch { buffer: b, .. } => b == buffer,
            Command::Timestamp(_) => false,
        }
    }
}

pub trait ComputeDevice {
    fn name(&self) -> &str;

    /// Threads per group of the bound compare-and-swap kernel.
    fn thread_group_size(&self) -> u32;

    /// Allocates a read/write buffer and uploads `contents` into it.
    fn create_buffer(&mut self, contents: &[u32]) -> Result<BufferId, DeviceError>;

    fn release_buffer(&mut self, buffer: BufferId);

    /// Records a read/write hazard barrier on `buffer`.
    fn uav_barrier(&mut self, buffer: BufferId) -> Result<(), DeviceError>;

    /// Records one dispatch with `pass` bound as root constants.
    fn dispatch(
        &mut self,
        buffer: BufferId,
        pass: PassDescriptor,
        thread_groups: u32,
    ) -> Result<(), DeviceError>;

    fn write_timestamp(&mut self, slot: u32) -> Result<(), DeviceError>;

    /// Drops everything recorded since the last submission without running it.
    fn discard_recorded(&mut self);

    /// Submits everything recorded so far and blocks until the fence signals.
    fn submit_and_wait(&mut self) -> Result<(), DeviceError>;

    /// Copies `buffer` back to host memory. Only valid once all work touching
    /// it has completed.
    fn read_buffer(&mut self, buffer: BufferId) -> Result<Vec<u32>, DeviceError>;

    fn resolve_timestamp(&self, slot: u32) -> Result<u64, DeviceError>;

    /// Timestamp ticks per second.
    fn timestamp_frequency(&self) -> u64;
}
