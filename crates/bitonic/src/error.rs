use crate::device::BufferId;

/// Rejected sort buffer length.
///
/// The network only exists for powers of two in `[2, 2^31]`; callers round up
/// and pad before asking for a pass sequence.
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("sort buffer length {len} is not a power of two in [2, 2^31]")]
pub struct InvalidSizeError {
    pub len: usize,
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum DeviceError {
    #[error("device removed: {0}")]
    DeviceRemoved(String),

    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),

    #[error("read/write hazard on {buffer:?}: dispatch {dispatch} follows a write with no barrier")]
    Hazard { buffer: BufferId, dispatch: usize },

    #[error("dispatch of {groups} thread groups exceeds the per-dimension limit of {limit}")]
    DispatchTooLarge { groups: u32, limit: u32 },

    #[error("pass with block size {block_size} does not fit {buffer:?} of {len} keys")]
    PassOutOfBounds {
        buffer: BufferId,
        len: usize,
        block_size: u32,
    },

    #[error("timestamp slot {slot} out of range (heap holds {capacity})")]
    TimestampOutOfRange { slot: u32, capacity: u32 },

    #[error("timestamp slot {0} was never written")]
    TimestampMissing(u32),

    #[error("{0:?} still has recorded work that was not submitted")]
    PendingWork(BufferId),
}

#[derive(thiserror::Error, Debug)]
pub enum SortError {
    #[error(transparent)]
    InvalidSize(#[from] InvalidSizeError),

    #[error("{0} keys exceed the largest sortable buffer of 2^31 slots")]
    TooManyKeys(usize),

    #[error("device failure: {0}")]
    Device(#[from] DeviceError),
}
