//! Big-endian integer packing for header fields.

/// Largest field width, in bytes, that fits a `u64`.
pub const MAX_FIELD_SIZE: usize = 8;

/// Whether `value` can be stored in `size` bytes.
pub fn fits(value: u64, size: usize) -> bool {
    size >= MAX_FIELD_SIZE || value >> (size * 8) == 0
}

/// Write `value` big-endian into `buffer[offset..offset + size]`.
///
/// The buffer grows with zero bytes as needed. Callers check [`fits`] first;
/// high bytes that do not fit are dropped.
pub fn int_to_bytes(value: u64, buffer: &mut Vec<u8>, offset: usize, size: usize) {
    if buffer.len() < offset + size {
        buffer.resize(offset + size, 0);
    }
    let encoded = value.to_be_bytes();
    let width = size.min(MAX_FIELD_SIZE);
    buffer[offset + size - width..offset + size].copy_from_slice(&encoded[MAX_FIELD_SIZE - width..]);
}

/// Read a big-endian integer from `data[offset..offset + size]`.
///
/// Returns `None` if the range is out of bounds.
pub fn bytes_to_int(data: &[u8], offset: usize, size: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + size)?;
    Some(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}
