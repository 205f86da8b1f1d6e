use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use voxrelay_core::{AudioUnit, ChunkEncoding, RawChunk, StreamError};

/// Decode one fetched record into an audio unit.
///
/// Base64 records are text; surrounding ASCII whitespace (a trailing newline
/// from the producer, for instance) is ignored.
pub fn decode_chunk(raw: RawChunk, encoding: ChunkEncoding) -> Result<AudioUnit, StreamError> {
    match encoding {
        ChunkEncoding::Raw => Ok(AudioUnit { bytes: raw.data }),
        ChunkEncoding::Base64 => {
            let text = raw.data.trim_ascii();
            let bytes = STANDARD
                .decode(text)
                .map_err(|e| StreamError::DecodeFailed(e.to_string()))?;
            Ok(AudioUnit { bytes })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_passes_bytes_through() {
        let unit = decode_chunk(RawChunk::new(vec![0u8, 1, 2, 255]), ChunkEncoding::Raw).unwrap();
        assert_eq!(unit.bytes, vec![0u8, 1, 2, 255]);
    }

    #[test]
    fn test_base64_decodes_text() {
        let unit = decode_chunk(RawChunk::new("AAEC/w=="), ChunkEncoding::Base64).unwrap();
        assert_eq!(unit.bytes, vec![0u8, 1, 2, 255]);
    }

    #[test]
    fn test_base64_ignores_surrounding_whitespace() {
        let unit = decode_chunk(RawChunk::new("  AAEC/w==\r\n"), ChunkEncoding::Base64).unwrap();
        assert_eq!(unit.bytes, vec![0u8, 1, 2, 255]);
    }

    #[test]
    fn test_base64_rejects_malformed_text() {
        let result = decode_chunk(RawChunk::new("not base64!"), ChunkEncoding::Base64);
        match result {
            Err(StreamError::DecodeFailed(_)) => {}
            other => panic!("expected DecodeFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_base64_empty_record_is_empty_audio() {
        let unit = decode_chunk(RawChunk::new(""), ChunkEncoding::Base64).unwrap();
        assert!(unit.bytes.is_empty());
    }
}
