//! Foundation types for remote-persist.
//!
//! Every other crate in the workspace depends on `persist-types`.
//!
//! # Key Types
//!
//! - [`Key`]: opaque object identifier, either a plain path key or a chunk
//!   key carrying an embedded chunk index
//! - [`Value`]: descriptor of one stored object: key, declared size,
//!   persistence state, and an optional in-memory buffer
//! - [`PersistState`]: tri-state persistence flag

pub mod error;
pub mod key;
pub mod value;

pub use error::TypeError;
pub use key::{Key, CHUNK_MARKER, CHUNK_SIZE, KEY_PREFIX_LEN};
pub use value::{PersistState, Value};
