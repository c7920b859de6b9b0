//! Versioned JSON envelope: `{"version": 1, "payload": ...}`.

use crate::StorageResult;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared_types::StorageError;

/// Envelope version written by this build.
pub const BLOB_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    payload: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeOwned {
    version: u32,
    payload: serde_json::Value,
}

/// Wrap `payload` in the current envelope and encode as pretty JSON.
pub fn encode_blob<T: Serialize>(payload: &T) -> StorageResult<Vec<u8>> {
    serde_json::to_vec_pretty(&EnvelopeRef {
        version: BLOB_VERSION,
        payload,
    })
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decode an envelope read from `key`, checking its version.
pub fn decode_blob<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> StorageResult<T> {
    let envelope: EnvelopeOwned =
        serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupted {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    if envelope.version != BLOB_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.to_string(),
            found: envelope.version,
            supported: BLOB_VERSION,
        });
    }
    serde_json::from_value(envelope.payload).map_err(|e| StorageError::Corrupted {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let bytes = encode_blob(&vec![1u32, 2, 3]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["payload"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_future_version_rejected() {
        let bytes = br#"{"version": 2, "payload": 5}"#;
        let err = decode_blob::<u32>("k", bytes).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn test_garbage_is_corruption() {
        let err = decode_blob::<u32>("k", b"{not json").unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { .. }));

        let err = decode_blob::<u32>("k", br#"{"version": 1, "payload": "x"}"#).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { .. }));
    }
}
