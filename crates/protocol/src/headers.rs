//! Parsers for the numeric protocol headers.

use crate::ProtocolError;
use crate::constants::{UPLOAD_LENGTH, UPLOAD_OFFSET};

/// Parses an `Upload-Offset` header value.
pub fn parse_offset(value: Option<&str>) -> Result<u64, ProtocolError> {
    parse_u64(UPLOAD_OFFSET, value)
}

/// Parses an `Upload-Length` header value.
pub fn parse_length(value: Option<&str>) -> Result<u64, ProtocolError> {
    parse_u64(UPLOAD_LENGTH, value)
}

fn parse_u64(name: &'static str, value: Option<&str>) -> Result<u64, ProtocolError> {
    let raw = value.ok_or(ProtocolError::MissingHeader(name))?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ProtocolError::InvalidHeader {
            name,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_offset() {
        assert_eq!(parse_offset(Some("1024")), Ok(1024));
        assert_eq!(parse_offset(Some(" 15 ")), Ok(15));
    }

    #[test]
    fn missing_offset_is_an_error() {
        assert_eq!(
            parse_offset(None),
            Err(ProtocolError::MissingHeader(UPLOAD_OFFSET))
        );
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(matches!(
            parse_offset(Some("-1")),
            Err(ProtocolError::InvalidHeader { .. })
        ));
        assert!(matches!(
            parse_length(Some("ten")),
            Err(ProtocolError::InvalidHeader { name: UPLOAD_LENGTH, .. })
        ));
    }
}
