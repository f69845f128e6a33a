use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// First byte of every chunk key.
pub const CHUNK_MARKER: u8 = 0x00;

/// Width of the fixed prefix carried by chunk keys: marker, one reserved
/// byte, a big-endian `u32` chunk index, and four reserved bytes.
pub const KEY_PREFIX_LEN: usize = 1 + 1 + 4 + 4;

/// Fixed size of one chunk of a remote file (4 MiB).
pub const CHUNK_SIZE: u64 = 1 << 22;

/// Opaque identifier for a stored object.
///
/// Two kinds share the same byte representation:
///
/// - *plain keys* are the UTF-8 bytes of a remote path;
/// - *chunk keys* start with [`CHUNK_MARKER`], embed a chunk index in a
///   [`KEY_PREFIX_LEN`]-byte prefix, and end with the parent object's path.
///
/// Keys are immutable once created.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(Vec<u8>);

impl Key {
    /// A plain key addressing the remote object at `path`.
    pub fn plain(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().as_bytes().to_vec())
    }

    /// A chunk key addressing chunk `index` of the object at `path`.
    pub fn chunk(path: impl AsRef<str>, index: u32) -> Self {
        let path = path.as_ref().as_bytes();
        let mut bytes = Vec::with_capacity(KEY_PREFIX_LEN + path.len());
        bytes.push(CHUNK_MARKER);
        bytes.push(0);
        bytes.extend_from_slice(&index.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(path);
        Self(bytes)
    }

    /// Rebuild a key from its raw encoding.
    ///
    /// Fails for empty input and for chunk-marked input shorter than the
    /// chunk prefix.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TypeError> {
        if bytes.is_empty() {
            return Err(TypeError::EmptyKey);
        }
        if bytes[0] == CHUNK_MARKER && bytes.len() < KEY_PREFIX_LEN {
            return Err(TypeError::TruncatedChunkKey {
                expected: KEY_PREFIX_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Returns `true` for chunk keys.
    pub fn is_chunk(&self) -> bool {
        self.0.first() == Some(&CHUNK_MARKER) && self.0.len() >= KEY_PREFIX_LEN
    }

    /// Chunk index, or `None` for plain keys.
    pub fn chunk_index(&self) -> Option<u32> {
        if !self.is_chunk() {
            return None;
        }
        let mut idx = [0u8; 4];
        idx.copy_from_slice(&self.0[2..6]);
        Some(u32::from_be_bytes(idx))
    }

    /// Byte offset of this chunk inside its parent object.
    ///
    /// Always a multiple of [`CHUNK_SIZE`]; `None` for plain keys.
    pub fn chunk_offset(&self) -> Option<u64> {
        self.chunk_index().map(|idx| u64::from(idx) * CHUNK_SIZE)
    }

    /// The path-bearing body of the key (everything after the chunk prefix).
    pub fn body(&self) -> &[u8] {
        if self.is_chunk() {
            &self.0[KEY_PREFIX_LEN..]
        } else {
            &self.0
        }
    }

    /// The raw encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex-encoded raw encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = String::from_utf8_lossy(self.body());
        match self.chunk_index() {
            Some(idx) => write!(f, "#{idx}:{body}"),
            None => write!(f, "{body}"),
        }
    }
}
