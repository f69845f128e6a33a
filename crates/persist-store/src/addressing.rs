//! Key-to-path addressing.
//!
//! External objects live wherever their key says: a plain key's body is the
//! remote path, and a chunk key addresses a byte range of the object named
//! by its body. Internal (ice) objects are named under the node's ice root
//! by an encoding of the whole key.

use persist_types::{Key, Value};

/// The remote path a key addresses.
///
/// Chunk keys yield their parent object's path. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn path_for_key(key: &Key) -> String {
    String::from_utf8_lossy(key.body()).into_owned()
}

/// Byte offset at which a key's data starts within the object at
/// [`path_for_key`].
pub fn skip_for_key(key: &Key) -> u64 {
    key.chunk_offset().unwrap_or(0)
}

/// Longest hex run placed in one path component of an ice object name.
pub const NAME_SEGMENT_LEN: usize = 200;

/// Marks a directory component of a long ice object name. Never appears in
/// hex, so a leaf file and a directory never share a name.
const DIR_SEGMENT_SUFFIX: char = '+';

/// Relative path of a value under the ice root.
///
/// Lower-case hex of the full key encoding, so distinct keys (including a
/// plain key and a chunk key over the same path) never share a name. Hex
/// longer than [`NAME_SEGMENT_LEN`] is split into nested directories, each
/// ending in `+`, keeping every component under filesystem name limits.
pub fn object_name(value: &Value) -> String {
    let hex = value.key().to_hex();
    if hex.len() <= NAME_SEGMENT_LEN {
        return hex;
    }
    let mut name = String::with_capacity(hex.len() + 2 * (hex.len() / NAME_SEGMENT_LEN));
    let mut rest = hex.as_str();
    while rest.len() > NAME_SEGMENT_LEN {
        let (segment, tail) = rest.split_at(NAME_SEGMENT_LEN);
        name.push_str(segment);
        name.push(DIR_SEGMENT_SUFFIX);
        name.push('/');
        rest = tail;
    }
    name.push_str(rest);
    name
}
