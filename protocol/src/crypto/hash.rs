//! # Hashing Utilities
//!
//! BLAKE3 is the only hash the pipeline uses: transaction commitments (what
//! gets signed) and transaction hashes (what gets reported back after
//! submission) are both BLAKE3 digests.

/// BLAKE3 digest of `data`.
///
/// ```
/// use txkit_protocol::crypto::blake3_hash;
///
/// assert_eq!(blake3_hash(b"txkit").len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Lower-case hex of the BLAKE3 digest of `data`. 64 characters.
pub fn blake3_hex(data: &[u8]) -> String {
    hex::encode(blake3_hash(data))
}
