//! Schema-checked decoding of stored JSON documents.
//!
//! Records are explicit structs. A document that does not match its schema is
//! an error in debug builds, so drift is caught during development. Release
//! builds log the problem and fall back to the type's `Default`.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Error, Result};

/// Decode a document, failing on any schema mismatch.
pub fn decode<T: DeserializeOwned>(path: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidRecord {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a document, degrading to `T::default()` in release builds.
pub fn decode_lenient<T: DeserializeOwned + Default>(path: &str, raw: &str) -> Result<T> {
    match decode(path, raw) {
        Ok(value) => Ok(value),
        Err(e) if cfg!(debug_assertions) => Err(e),
        Err(e) => {
            warn!(path, error = %e, "Malformed record, using defaults");
            Ok(T::default())
        }
    }
}
