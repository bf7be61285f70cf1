//! LZW stream decoder backed by the weezl crate.

use crate::error::Result;
use weezl::{decode::Decoder, BitOrder};

/// Decode LZW-encoded data (PDF variant: MSB first, 8-bit codes).
pub fn lzwdecode(data: &[u8]) -> Result<Vec<u8>> {
    lzwdecode_with_earlychange(data, 1)
}

/// Decode LZW-encoded data honoring the EarlyChange parameter.
///
/// EarlyChange=1 is the PDF default; EarlyChange=0 switches code sizes one
/// code later, as TIFF does.
pub fn lzwdecode_with_earlychange(data: &[u8], early_change: i64) -> Result<Vec<u8>> {
    let mut decoder = if early_change == 0 {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };
    let mut output = Vec::new();
    // Lenient: corrupt data yields the partial output decoded so far.
    let _ = decoder.into_vec(&mut output).decode(data);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weezl::encode::Encoder;

    #[test]
    fn test_lzw_roundtrip() {
        let input = b"aaabbbcccaaabbbccc".to_vec();
        let encoded = Encoder::new(BitOrder::Msb, 8).encode(&input).unwrap();
        assert_eq!(lzwdecode(&encoded).unwrap(), input);
    }

    #[test]
    fn test_lzw_known_vector() {
        // Classic PDF reference sample: "-----A---B" with EarlyChange=1.
        let data = [0x80, 0x0b, 0x60, 0x50, 0x22, 0x0c, 0x0c, 0x85, 0x01];
        assert_eq!(lzwdecode(&data).unwrap(), b"-----A---B");
    }
}
