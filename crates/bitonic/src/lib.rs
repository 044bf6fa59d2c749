mod buffer;
pub mod device;
mod error;
pub mod kernel;
mod orchestrator;
pub mod pass;
pub mod timing;

pub use buffer::{PADDING_KEY, SortBuffer, padded_len};
pub use error::{DeviceError, InvalidSizeError, SortError};
pub use orchestrator::{BitonicSorter, SortReport};
pub use pass::{PassDescriptor, PassSequence, pass_count, passes};

#[inline]
pub fn is_sorted_non_decreasing(data: &[u32]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}
