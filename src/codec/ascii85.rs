//! ASCII85 and ASCIIHex stream decoders.

use crate::error::Result;

/// Decode ASCII85-encoded data (PDF variant).
/// Handles z-encoding, `<~ ~>` markers, embedded whitespace, and a
/// missing EOD marker.
pub fn ascii85decode(data: &[u8]) -> Result<Vec<u8>> {
    let data = if data.starts_with(b"<~") {
        &data[2..]
    } else {
        data
    };

    // Stop at the ~> end marker, ignoring trailing junk.
    let data = match data.iter().position(|&b| b == b'~') {
        Some(pos) => &data[..pos],
        None => data,
    };

    // Filter whitespace and expand 'z' (four zero bytes).
    let mut filtered = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            b'z' => filtered.extend_from_slice(b"!!!!!"),
            b'!'..=b'u' => filtered.push(byte),
            _ => continue,
        }
    }

    let mut result = Vec::with_capacity(filtered.len() / 5 * 4 + 4);
    for chunk in filtered.chunks(5) {
        if chunk.len() == 5 {
            let mut value: u32 = 0;
            for &byte in chunk {
                value = value.wrapping_mul(85).wrapping_add((byte - b'!') as u32);
            }
            result.extend_from_slice(&value.to_be_bytes());
        } else if !chunk.is_empty() {
            // Short final group: pad with 'u', keep len-1 output bytes.
            let mut padded = [b'u'; 5];
            padded[..chunk.len()].copy_from_slice(chunk);
            let mut value: u32 = 0;
            for &byte in &padded {
                value = value.wrapping_mul(85).wrapping_add((byte - b'!') as u32);
            }
            result.extend_from_slice(&value.to_be_bytes()[..chunk.len() - 1]);
        }
    }

    Ok(result)
}

/// Decode ASCIIHex-encoded data; `>` terminates, an odd final digit is
/// treated as followed by 0.
pub fn asciihexdecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;

    for &byte in data {
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b'>' => break,
            _ => continue,
        };

        match pending {
            Some(high) => {
                result.push((high << 4) | nibble);
                pending = None;
            }
            None => pending = Some(nibble),
        }
    }

    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}
