//! Canonical byte encodings for every bucket key and value (spec §4.1,
//! §6).
//!
//! Every function here is pure: given bytes, return fields; given
//! fields, return bytes. Nothing in this module touches `sled` — it
//! only knows about `&[u8]` and the record types in [`crate::records`].
//! Design rule carried from spec §4.1: never mutate a value byte-slice
//! retrieved from the store without re-encoding it through [`codec`] and
//! writing the fresh bytes back through a putter.

pub mod codec;
pub mod keys;

pub use codec::*;
pub use keys::*;
