//! Flate (zlib/deflate) stream decoder.

use crate::error::{PdfError, Result};
use std::io::Read;

/// Decode FlateDecode data. Corrupt streams fall back to a lenient
/// byte-at-a-time pass that keeps whatever decoded cleanly.
pub fn flatedecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) => Ok(decompressed),
        Err(_) => {
            let partial = decompress_corrupted(data);
            if partial.is_empty() {
                Err(PdfError::FilterError {
                    filter: "FlateDecode".into(),
                    reason: "invalid zlib data".into(),
                })
            } else {
                Ok(partial)
            }
        }
    }
}

/// Best-effort zlib decompression for corrupted streams: feed one byte at
/// a time and return the output accumulated before the decoder failed
/// (commonly a CRC error in the last block).
fn decompress_corrupted(data: &[u8]) -> Vec<u8> {
    use flate2::{Decompress, FlushDecompress, Status};
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        if produced > 0 {
            out.extend_from_slice(&buf[..produced]);
        }
        let consumed = (decoder.total_in() - before_in) as usize;
        i += consumed.max(1);
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_flate_roundtrip() {
        let input = b"stream payload stream payload".to_vec();
        assert_eq!(flatedecode(&deflate(&input)).unwrap(), input);
    }

    #[test]
    fn test_flate_truncated_recovers_prefix() {
        let encoded = deflate(b"hello world, hello world, hello world");
        let truncated = &encoded[..encoded.len() - 6];
        let out = flatedecode(truncated).unwrap();
        assert!(b"hello world, hello world, hello world".starts_with(&out[..]));
        assert!(!out.is_empty());
    }

    #[test]
    fn test_flate_garbage_is_error() {
        assert!(flatedecode(b"not zlib at all").is_err());
    }
}
