//! `Upload-Metadata` header encoding.
//!
//! The header is a comma separated list of `key base64(value)` pairs. Keys
//! are plain ASCII-ish strings without spaces, commas or control characters;
//! values are arbitrary bytes.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::ProtocolError;

/// Ordered key/value metadata attached to an upload at creation time.
///
/// Insertion order is preserved so the encoded header is deterministic.
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    entries: Vec<(String, Vec<u8>)>,
}

impl UploadMetadata {
    /// Creates an empty metadata set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a pair.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), ProtocolError> {
        let key = key.into();
        validate_key(&key)?;
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Returns the value for `key` as UTF-8, if it is valid UTF-8.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the pairs as an `Upload-Metadata` header value.
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key} {}", STANDARD.encode(value))
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Decodes an `Upload-Metadata` header value.
    ///
    /// A pair without a value (`key` alone) decodes to an empty value.
    pub fn parse(header: &str) -> Result<Self, ProtocolError> {
        let mut metadata = Self::new();
        for pair in header.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let mut parts = pair.splitn(2, ' ');
            let key = parts.next().unwrap_or_default();
            let value = match parts.next().map(str::trim) {
                Some(encoded) if !encoded.is_empty() => STANDARD
                    .decode(encoded)
                    .map_err(|_| ProtocolError::InvalidMetadataValue {
                        key: key.to_string(),
                    })?,
                _ => Vec::new(),
            };
            metadata.insert(key, value)?;
        }
        Ok(metadata)
    }
}

fn validate_key(key: &str) -> Result<(), ProtocolError> {
    let invalid = key.is_empty()
        || key
            .chars()
            .any(|c| c == ' ' || c == ',' || c.is_control());
    if invalid {
        return Err(ProtocolError::InvalidMetadataKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_pairs_in_insertion_order() {
        let mut metadata = UploadMetadata::new();
        metadata.insert("filename", "world_domination_plan.pdf").unwrap();
        metadata.insert("filetype", "application/pdf").unwrap();

        assert_eq!(
            metadata.encode(),
            "filename d29ybGRfZG9taW5hdGlvbl9wbGFuLnBkZg==,filetype YXBwbGljYXRpb24vcGRm"
        );
    }

    #[test]
    fn insert_replaces_existing_value() {
        let mut metadata = UploadMetadata::new();
        metadata.insert("filename", "a.txt").unwrap();
        metadata.insert("filetype", "text/plain").unwrap();
        metadata.insert("filename", "b.txt").unwrap();

        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get_str("filename"), Some("b.txt"));
        assert_eq!(metadata.keys().collect::<Vec<_>>(), ["filename", "filetype"]);
    }

    #[test]
    fn empty_value_encodes_as_bare_key() {
        let mut metadata = UploadMetadata::new();
        metadata.insert("is_confidential", Vec::new()).unwrap();
        assert_eq!(metadata.encode(), "is_confidential");
    }

    #[test]
    fn rejects_bad_keys() {
        let mut metadata = UploadMetadata::new();
        for key in ["", "file name", "a,b", "tab\there", "nl\n"] {
            assert_eq!(
                metadata.insert(key, "x"),
                Err(ProtocolError::InvalidMetadataKey(key.to_string())),
                "key {key:?} should be rejected"
            );
        }
        assert!(metadata.is_empty());
    }

    #[test]
    fn parse_accepts_encoded_header() {
        let parsed =
            UploadMetadata::parse("filename dGVzdC5iaW4=, filetype YXBwbGljYXRpb24vb2N0ZXQtc3RyZWFt,flag")
                .unwrap();
        assert_eq!(parsed.get_str("filename"), Some("test.bin"));
        assert_eq!(parsed.get_str("filetype"), Some("application/octet-stream"));
        assert_eq!(parsed.get("flag"), Some(&[][..]));
    }

    #[test]
    fn parse_rejects_invalid_base64() {
        assert_eq!(
            UploadMetadata::parse("filename !!!"),
            Err(ProtocolError::InvalidMetadataValue {
                key: "filename".into()
            })
        );
    }

    #[test]
    fn binary_values_survive_encoding() {
        let mut metadata = UploadMetadata::new();
        metadata.insert("blob", vec![0u8, 255, 10, 13]).unwrap();
        let parsed = UploadMetadata::parse(&metadata.encode()).unwrap();
        assert_eq!(parsed.get("blob"), Some(&[0u8, 255, 10, 13][..]));
    }
}
