//! CRC-32 helpers for frame integrity.
//!
//! Thin wrappers over `crc32fast` shaped to the two operations the codec
//! needs: compute a checksum over a byte range, and extend a previously
//! computed checksum across more bytes as if the two ranges were
//! contiguous. Table setup is handled inside `crc32fast`; there is no
//! process-wide init to call.

use crc32fast::Hasher;

/// Compute the CRC-32 of `bytes`.
pub fn compute(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Extend a previously computed CRC-32 across `bytes`.
///
/// `concat(compute(a), b)` equals `compute(a ++ b)`.
pub fn concat(crc: u32, bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(crc);
    hasher.update(bytes);
    hasher.finalize()
}

/// The frame checksum: CRC-32 over destination, source, the payload length
/// byte and the payload, in that order. The preamble is excluded.
pub fn frame_checksum(destination: u8, source: u8, payload: &[u8]) -> u32 {
    let header = [destination, source, payload.len() as u8];
    concat(compute(&header), payload)
}
