//! Wire-level pieces of the resumable upload protocol.
//!
//! Header names, the protocol version, `Upload-Metadata` encoding and the
//! parsers for numeric headers. Nothing here performs I/O.

pub mod constants;
pub mod headers;
pub mod metadata;

pub use headers::{parse_length, parse_offset};
pub use metadata::UploadMetadata;

/// Errors produced while encoding or decoding protocol values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid metadata key: {0:?}")]
    InvalidMetadataKey(String),

    #[error("invalid metadata value for key {key:?}")]
    InvalidMetadataValue { key: String },

    #[error("invalid {name} header: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("missing {0} header")]
    MissingHeader(&'static str),
}
