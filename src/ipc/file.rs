//! Persisted form: a value tree serialised to disk.
//!
//! Two magic octets `FF 01`, then the little-endian encoded body. No frame
//! header, no compression.

use std::fs;
use std::path::Path;

use crate::error::KxError;
use crate::types::K;

use super::decode::{decode_value, Cursor};
use super::encode::encode_value;

const MAGIC: [u8; 2] = [0xff, 0x01];

/// Serialises a value to its persisted form.
pub fn to_bytes(value: &K) -> Result<Vec<u8>, KxError> {
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(&MAGIC);
    encode_value(&mut buf, value)?;
    Ok(buf)
}

/// Parses a value from its persisted form.
pub fn from_bytes(bytes: &[u8]) -> Result<K, KxError> {
    match bytes {
        [0xff, 0x01, body @ ..] => {
            let mut cur = Cursor::new(body, true);
            decode_value(&mut cur)
        }
        _ => Err(KxError::BadMessage("bad file magic".into())),
    }
}

/// Writes a value to a file in persisted form.
pub fn save(path: impl AsRef<Path>, value: &K) -> Result<(), KxError> {
    fs::write(path, to_bytes(value)?)?;
    Ok(())
}

/// Reads a value back from a file written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<K, KxError> {
    from_bytes(&fs::read(path)?)
}
