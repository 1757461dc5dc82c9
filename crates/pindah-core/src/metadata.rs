//! Metadata cell codec.
//!
//! Metadata travels through CSV as a single JSON-object cell. An empty
//! map encodes to the empty string; the empty string, `null`, and absent
//! cells all decode back to the empty map.

use crate::error::RecordError;
use crate::Result;

/// Free-form entity metadata: an unordered string-keyed JSON object.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Encode a metadata map into one CSV cell.
pub fn encode(metadata: &Metadata) -> Result<String> {
    if metadata.is_empty() {
        return Ok(String::new());
    }
    serde_json::to_string(metadata).map_err(|e| {
        RecordError::Metadata {
            message: e.to_string(),
        }
        .into()
    })
}

/// Decode a CSV cell into a metadata map.
pub fn decode(cell: &str) -> Result<Metadata> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "null" {
        return Ok(Metadata::new());
    }
    serde_json::from_str(cell).map_err(|e| {
        RecordError::Metadata {
            message: e.to_string(),
        }
        .into()
    })
}
