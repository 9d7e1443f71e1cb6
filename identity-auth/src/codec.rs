//! Compression of serialized sessions for size-constrained session stores.
//!
//! Sessions are gzip-compressed and base64 encoded so the blob can live in any
//! string-valued store, cookies included.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, ErrorKind};

/// Compress a serialized session into a storable blob.
pub fn compress(plain: &str) -> Result<String, Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(plain.as_bytes())
        .map_err(|e| Error::with_source(ErrorKind::SessionCodecError, e))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::with_source(ErrorKind::SessionCodecError, e))?;
    Ok(BASE64.encode(compressed))
}

/// Restore the serialized session from a blob produced by [`compress`].
pub fn decompress(blob: &str) -> Result<String, Error> {
    let compressed = BASE64
        .decode(blob)
        .map_err(|e| Error::with_source(ErrorKind::SessionCodecError, e))?;

    let mut plain = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut plain)
        .map_err(|e| Error::with_source(ErrorKind::SessionCodecError, e))?;
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let session = r#"{"AuthURL":"http://example.com/auth?state=abc","AccessToken":"1234567890"}"#;
        assert_eq!(decompress(&compress(session).unwrap()).unwrap(), session);
    }

    #[test]
    fn test_round_trip_empty_string() {
        assert_eq!(decompress(&compress("").unwrap()).unwrap(), "");
    }

    #[test]
    fn test_round_trip_unicode() {
        let text = "héllo wörld ✓";
        assert_eq!(decompress(&compress(text).unwrap()).unwrap(), text);
    }

    #[test]
    fn test_compresses_repetitive_tokens() {
        let token = "eyJhbGciOiJSUzI1NiJ9.".repeat(64);
        assert!(compress(&token).unwrap().len() < token.len());
    }

    #[test]
    fn test_decompress_rejects_non_base64() {
        let err = decompress("not base64 !!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionCodecError);
    }

    #[test]
    fn test_decompress_rejects_non_gzip() {
        let err = decompress(&BASE64.encode(b"plain bytes")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionCodecError);
    }

    #[test]
    fn test_decompress_rejects_truncated_stream() {
        let blob = compress(&"token".repeat(100)).unwrap();
        let mut raw = BASE64.decode(blob).unwrap();
        raw.truncate(raw.len() / 2);
        let err = decompress(&BASE64.encode(raw)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionCodecError);
    }
}
