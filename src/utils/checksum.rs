//! CRC-32 checksum of upload content.
//!
//! Standard reflected CRC-32 (polynomial 0xEDB88320, init and xor-out
//! 0xFFFFFFFF), the same value the server computes with `zlib.crc32` over the
//! decrypted content it received.

/// Compute the CRC-32 of `data` in one pass.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
