//! Transparent zstd framing for file content at rest.

use crate::error::{Error, Result};

/// Magic number that opens every zstd frame, little-endian `0xFD2FB528`.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

const COMPRESSION_LEVEL: i32 = 3;

/// Reports whether `data` starts with a zstd frame header.
#[must_use]
pub fn is_zstd(data: &[u8]) -> bool {
    data.starts_with(&ZSTD_MAGIC)
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, COMPRESSION_LEVEL).map_err(|e| Error::Codec(e.to_string()))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| Error::Codec(e.to_string()))
}

/// Returns the logical bytes for stored content, decompressing only when a
/// zstd frame is present.
pub fn decode(stored: &[u8]) -> Result<Vec<u8>> {
    if is_zstd(stored) {
        decompress(stored)
    } else {
        Ok(stored.to_vec())
    }
}

/// Produces the at-rest form of `content`.
pub fn encode(content: &[u8], compress_content: bool) -> Result<Vec<u8>> {
    if compress_content {
        compress(content)
    } else {
        Ok(content.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_zstd_only_on_magic() {
        assert!(is_zstd(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]));
        assert!(!is_zstd(&[0x28, 0xB5, 0x2F]));
        assert!(!is_zstd(b"hello world"));
        assert!(!is_zstd(&[]));
    }

    #[test]
    fn test_compressed_output_is_framed() {
        let framed = compress(b"hello world\n").unwrap();
        assert!(is_zstd(&framed));
    }

    #[test]
    fn test_decode_passes_plain_bytes_through() {
        let plain = b"#!/bin/sh\necho hi\n".to_vec();
        assert_eq!(decode(&plain).unwrap(), plain);
    }

    #[test]
    fn test_encode_decode() {
        let inputs: [&[u8]; 4] = [b"", b"a", b"hello world\n", &[0u8, 1, 2, 255, 254]];
        for input in inputs {
            for compress_content in [true, false] {
                let stored = encode(input, compress_content).unwrap();
                assert_eq!(decode(&stored).unwrap(), input);
            }
        }
    }

    #[test]
    fn test_decompress_garbage_errors() {
        let mut garbage = ZSTD_MAGIC.to_vec();
        garbage.extend_from_slice(b"not really zstd");
        assert!(matches!(decode(&garbage), Err(Error::Codec(_))));
    }
}
