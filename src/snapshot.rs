//! Index snapshot persistence: a black-box save/load round-trip for a built
//! `InvertedIndex`, independent of the filter bytecode's own binary format.
//!
//! A `bincode`-serialized payload with a trailing `crc32fast` checksum, so
//! a truncated or bit-flipped snapshot is rejected rather than silently
//! misread.

use crc32fast::Hasher;

use crate::error::{InfidexError, InvariantError};
use crate::types::InvertedIndex;

/// Serializes an index to `bincode`, appending a 4-byte little-endian CRC32
/// of the payload.
pub fn save_snapshot(index: &InvertedIndex) -> Result<Vec<u8>, InfidexError> {
    let mut payload = bincode::serialize(index)
        .map_err(|e| InvariantError::Other(format!("snapshot encode failed: {e}")))?;
    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let checksum = hasher.finalize();
    payload.extend_from_slice(&checksum.to_le_bytes());
    Ok(payload)
}

/// Verifies the trailing checksum and deserializes the payload. Rejects
/// anything shorter than the checksum footer, and any payload whose CRC32
/// doesn't match — a corrupt or foreign-format snapshot never reaches
/// `bincode::deserialize`.
pub fn load_snapshot(bytes: &[u8]) -> Result<InvertedIndex, InfidexError> {
    if bytes.len() < 4 {
        return Err(InvariantError::Other("snapshot shorter than its checksum footer".to_string()).into());
    }
    let (payload, footer) = bytes.split_at(bytes.len() - 4);
    let expected = u32::from_le_bytes(footer.try_into().unwrap());
    let mut hasher = Hasher::new();
    hasher.update(payload);
    let actual = hasher.finalize();
    if actual != expected {
        return Err(InvariantError::Other(format!(
            "snapshot checksum mismatch: expected {expected:#010x}, found {actual:#010x}"
        ))
        .into());
    }
    bincode::deserialize(payload)
        .map_err(|e| InvariantError::Other(format!("snapshot decode failed: {e}")).into())
}
