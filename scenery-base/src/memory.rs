pub fn round_size_up_to_alignment_usize(
    size: usize,
    required_alignment: usize,
) -> usize {
    assert!(required_alignment > 0);
    ((size + required_alignment - 1) / required_alignment) * required_alignment
}

/// Byte size of `count` values of `T`, or `None` if it does not fit in a `usize`
pub fn array_size_in_bytes<T>(count: usize) -> Option<usize> {
    std::mem::size_of::<T>().checked_mul(count)
}

/// Bytes needed to store `bit_count` packed bits
pub fn bit_array_size_in_bytes(bit_count: usize) -> usize {
    (bit_count + 7) / 8
}
