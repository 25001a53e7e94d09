//! Little-endian readers for the binary spreadsheet containers.
//! Short slices are zero-padded rather than panicking so that truncated
//! files surface as parse errors further up instead of aborting the process.

/// Copies up to `N` leading bytes into a fixed array, zero-padding the rest.
#[inline]
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    let size = N.min(bytes.len());
    array[..size].copy_from_slice(&bytes[..size]);
    array
}

#[inline]
pub(crate) fn to_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes(le_array(bytes))
}

#[inline]
pub(crate) fn to_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(le_array(bytes))
}

#[inline]
pub(crate) fn to_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(le_array(bytes))
}

#[inline]
pub(crate) fn to_f64(bytes: &[u8]) -> f64 {
    f64::from_le_bytes(le_array(bytes))
}

/// Reads a 32-bit sector or record index as usize.
#[inline]
pub(crate) fn to_usize(bytes: &[u8]) -> usize {
    to_u32(bytes) as usize
}

/// Splits a byte slice into consecutive 32-bit little-endian indexes.
pub(crate) fn to_usize_iter(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(to_usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        assert_eq!(to_u16(&[0x34, 0x12]), 0x1234);
        assert_eq!(to_u32(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(to_f64(&1.5f64.to_le_bytes()), 1.5);
    }

    #[test]
    fn pads_truncated_input() {
        assert_eq!(to_u32(&[0x01]), 1);
        assert_eq!(to_u64(&[]), 0);
    }

    #[test]
    fn iterates_indexes_and_drops_partial_tail() {
        let indexes: Vec<usize> = to_usize_iter(&[1, 0, 0, 0, 2, 0, 0, 0, 9]).collect();
        assert_eq!(indexes, vec![1, 2]);
    }
}
