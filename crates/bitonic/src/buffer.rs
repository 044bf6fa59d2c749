use crate::SortError;
use crate::pass::MAX_SORT_LEN;

/// Fill value for slots past the real keys; sorts after every real key.
pub const PADDING_KEY: u32 = u32::MAX;

/// Smallest valid network length holding `real_len` keys.
#[inline]
pub fn padded_len(real_len: usize) -> usize {
    real_len.next_power_of_two().max(2)
}

/// Host copy of the keys to sort, padded to a power of two.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortBuffer {
    keys: Vec<u32>,
    real_len: usize,
}

impl SortBuffer {
    pub fn from_keys(keys: &[u32]) -> Result<Self, SortError> {
        if keys.len() > MAX_SORT_LEN {
            return Err(SortError::TooManyKeys(keys.len()));
        }

        let len = padded_len(keys.len());
        let mut padded = Vec::with_capacity(len);
        padded.extend_from_slice(keys);
        padded.resize(len, PADDING_KEY);

        Ok(Self {
            keys: padded,
            real_len: keys.len(),
        })
    }

    /// Wraps keys read back from a device buffer sized for `real_len` keys.
    pub(crate) fn from_readback(keys: Vec<u32>, real_len: usize) -> Self {
        debug_assert!(real_len <= keys.len());
        Self { keys, real_len }
    }

    /// Network length: a power of two no smaller than two.
    pub fn padded_len(&self) -> usize {
        self.keys.len()
    }

    pub fn real_len(&self) -> usize {
        self.real_len
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.keys
    }

    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.keys
    }

    /// Slots past the real keys.
    pub fn padding(&self) -> &[u32] {
        &self.keys[self.real_len..]
    }

    /// The first `real_len` keys. After a sort these are the real keys in order.
    pub fn into_keys(mut self) -> Vec<u32> {
        self.keys.truncate(self.real_len);
        self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_lengths() {
        let cases = [(0_usize, 2_usize), (1, 2), (2, 2), (3, 4), (4, 4), (5, 8), (1000, 1024)];
        for (real, padded) in cases {
            assert_eq!(padded_len(real), padded, "real={real}");
        }
    }

    #[test]
    fn pads_with_max_key() {
        let buffer = SortBuffer::from_keys(&[7, 1, 4]).unwrap();
        assert_eq!(buffer.padded_len(), 4);
        assert_eq!(buffer.real_len(), 3);
        assert_eq!(buffer.as_slice(), &[7, 1, 4, PADDING_KEY]);
        assert_eq!(buffer.padding(), &[PADDING_KEY]);
    }

    #[test]
    fn empty_input_still_forms_a_network() {
        let buffer = SortBuffer::from_keys(&[]).unwrap();
        assert_eq!(buffer.real_len(), 0);
        assert_eq!(buffer.as_slice(), &[PADDING_KEY, PADDING_KEY]);
        assert!(buffer.into_keys().is_empty());
    }

    #[test]
    fn into_keys_drops_padding() {
        let buffer = SortBuffer::from_keys(&[3, 2, 1, 0, 9]).unwrap();
        assert_eq!(buffer.padded_len(), 8);
        assert_eq!(buffer.into_keys(), vec![3, 2, 1, 0, 9]);
    }
}
