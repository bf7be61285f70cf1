//! Stream filter pipeline.
//!
//! Decoders for the standard PDF stream filters, chained left-to-right
//! per the stream's `Filter` entry with the matched `DecodeParms`.
//! Predictors (PNG 10-15, TIFF 2) run as a post-stage after the
//! decompression filter that declared them.

pub mod ascii85;
pub mod ccitt;
pub mod flate;
pub mod lzw;
pub mod runlength;

pub use ascii85::{ascii85decode, asciihexdecode};
pub use ccitt::{ccittfaxdecode, CcittParams};
pub use flate::flatedecode;
pub use lzw::{lzwdecode, lzwdecode_with_earlychange};
pub use runlength::rldecode;

use crate::error::{PdfError, Result};
use crate::model::color::INLINE_FILTER_ABBREV;
use crate::model::objects::PDFObject;
use std::collections::HashMap;

/// Expand an abbreviated inline-image filter name to its canonical form.
pub fn canonical_filter_name(name: &str) -> &str {
    INLINE_FILTER_ABBREV.get(name).copied().unwrap_or(name)
}

/// Normalize a resolved `Filter` entry to a list of filter names and pair
/// each with its `DecodeParms` dictionary.
pub fn filter_chain(
    filter: Option<&PDFObject>,
    parms: Option<&PDFObject>,
) -> Vec<(String, Option<HashMap<String, PDFObject>>)> {
    let names: Vec<String> = match filter {
        Some(PDFObject::Name(name)) => vec![canonical_filter_name(name).to_string()],
        Some(PDFObject::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_name().ok())
            .map(|name| canonical_filter_name(name).to_string())
            .collect(),
        _ => Vec::new(),
    };

    let parm_for = |i: usize| -> Option<HashMap<String, PDFObject>> {
        match parms {
            Some(PDFObject::Dict(d)) if i == 0 => Some(d.clone()),
            Some(PDFObject::Array(arr)) => match arr.get(i) {
                Some(PDFObject::Dict(d)) => Some(d.clone()),
                _ => None,
            },
            _ => None,
        }
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, parm_for(i)))
        .collect()
}

/// Apply the stream's filter chain to its raw payload.
///
/// `filter` and `parms` must already be resolved (no indirect references
/// inside). Errors abort the affected stream only.
pub fn apply_filters(
    data: &[u8],
    filter: Option<&PDFObject>,
    parms: Option<&PDFObject>,
) -> Result<Vec<u8>> {
    let chain = filter_chain(filter, parms);
    let mut output = data.to_vec();

    for (name, parms) in chain {
        output = apply_one_filter(&output, &name, parms.as_ref())?;
    }

    Ok(output)
}

fn apply_one_filter(
    data: &[u8],
    name: &str,
    parms: Option<&HashMap<String, PDFObject>>,
) -> Result<Vec<u8>> {
    let get_int = |key: &str, default: i64| -> i64 {
        parms
            .and_then(|p| p.get(key))
            .and_then(|v| v.as_int().ok())
            .unwrap_or(default)
    };
    let get_bool = |key: &str, default: bool| -> bool {
        parms
            .and_then(|p| p.get(key))
            .and_then(|v| v.as_bool().ok())
            .unwrap_or(default)
    };

    let decoded = match name {
        "ASCIIHexDecode" => asciihexdecode(data)?,
        "ASCII85Decode" => ascii85decode(data)?,
        "RunLengthDecode" => rldecode(data)?,
        "FlateDecode" => flatedecode(data)?,
        "LZWDecode" => lzwdecode_with_earlychange(data, get_int("EarlyChange", 1))?,
        "CCITTFaxDecode" => {
            let params = CcittParams {
                k: get_int("K", 0),
                columns: get_int("Columns", 1728).max(0) as usize,
                rows: get_int("Rows", 0).max(0) as usize,
                encoded_byte_align: get_bool("EncodedByteAlign", false),
                black_is_1: get_bool("BlackIs1", false),
            };
            ccittfaxdecode(data, &params)?
        }
        // Image codecs handed to the consumer undecoded.
        "DCTDecode" | "JPXDecode" | "JBIG2Decode" => data.to_vec(),
        "Crypt" => data.to_vec(),
        other => {
            return Err(PdfError::FilterError {
                filter: other.to_string(),
                reason: "unsupported filter".into(),
            });
        }
    };

    // Predictor post-stage for the decompression filters.
    if matches!(name, "FlateDecode" | "LZWDecode") {
        let predictor = get_int("Predictor", 1);
        if predictor >= 2 {
            let columns = get_int("Columns", 1).max(1) as usize;
            let colors = get_int("Colors", 1).max(1) as usize;
            let bits = get_int("BitsPerComponent", 8).max(1) as usize;
            return apply_predictor(&decoded, predictor, columns, colors, bits);
        }
    }

    Ok(decoded)
}

/// Reverse a predictor: TIFF predictor 2 or PNG predictors 10-15.
pub fn apply_predictor(
    data: &[u8],
    predictor: i64,
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    match predictor {
        2 => apply_tiff_predictor(data, columns, colors, bits_per_component),
        10..=15 => apply_png_predictor(data, columns, colors, bits_per_component),
        other => Err(PdfError::FilterError {
            filter: "Predictor".into(),
            reason: format!("unknown predictor {}", other),
        }),
    }
}

/// TIFF predictor 2: each sample is stored as a delta from the sample to
/// its left. Only the 8-bit component case is differenced bytewise.
fn apply_tiff_predictor(
    data: &[u8],
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    if bits_per_component != 8 {
        return Err(PdfError::FilterError {
            filter: "Predictor".into(),
            reason: format!("TIFF predictor with {} bits unsupported", bits_per_component),
        });
    }
    let row_bytes = columns * colors;
    let mut result = data.to_vec();
    for row in result.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(result)
}

/// PNG predictors: each row carries a filter-type byte followed by the
/// filtered row data.
fn apply_png_predictor(
    data: &[u8],
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    let row_bytes = (colors * columns * bits_per_component).div_ceil(8);
    let bpp = (colors * bits_per_component).div_ceil(8).max(1);
    let row_size = row_bytes + 1;

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];

    for row_start in (0..data.len()).step_by(row_size) {
        if row_start + row_size > data.len() {
            break;
        }

        let filter_type = data[row_start];
        let row_data = &data[row_start + 1..row_start + row_size];
        let mut current_row = vec![0u8; row_bytes];

        match filter_type {
            0 => current_row.copy_from_slice(row_data),
            1 => {
                // Sub
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(left);
                }
            }
            2 => {
                // Up
                for i in 0..row_bytes {
                    current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                // Average
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] as u16 } else { 0 };
                    let above = prev_row[i] as u16;
                    current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                // Paeth
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    let above = prev_row[i];
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    let paeth = paeth_predictor(left, above, upper_left);
                    current_row[i] = row_data[i].wrapping_add(paeth);
                }
            }
            _ => current_row.copy_from_slice(row_data),
        }

        result.extend_from_slice(&current_row);
        prev_row = current_row;
    }

    Ok(result)
}

fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
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
    fn test_chained_filters() {
        // ASCII85 wrapped around Flate, as PDF producers commonly emit.
        let payload = b"chained filter payload";
        let compressed = deflate(payload);
        let mut a85 = Vec::new();
        for chunk in compressed.chunks(4) {
            if chunk.len() == 4 {
                let mut value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let mut group = [0u8; 5];
                for slot in group.iter_mut().rev() {
                    *slot = (value % 85) as u8 + b'!';
                    value /= 85;
                }
                a85.extend_from_slice(&group);
            } else {
                let mut padded = [0u8; 4];
                padded[..chunk.len()].copy_from_slice(chunk);
                let mut value = u32::from_be_bytes(padded);
                let mut group = [0u8; 5];
                for slot in group.iter_mut().rev() {
                    *slot = (value % 85) as u8 + b'!';
                    value /= 85;
                }
                a85.extend_from_slice(&group[..chunk.len() + 1]);
            }
        }
        a85.extend_from_slice(b"~>");

        let filter = PDFObject::Array(vec![
            PDFObject::Name("ASCII85Decode".into()),
            PDFObject::Name("FlateDecode".into()),
        ]);
        let out = apply_filters(&a85, Some(&filter), None).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn test_abbreviated_names() {
        let filter = PDFObject::Name("AHx".into());
        let out = apply_filters(b"414243>", Some(&filter), None).unwrap();
        assert_eq!(out, b"ABC");
    }

    #[test]
    fn test_png_up_predictor() {
        // Two rows of 3 bytes, Up-filtered.
        let raw = [
            2, 1, 2, 3, // row 0: prev is zero, so output = data
            2, 1, 1, 1, // row 1: adds row 0
        ];
        let out = apply_predictor(&raw, 12, 3, 1, 8).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_tiff_predictor() {
        let raw = [10, 5, 5]; // deltas
        let out = apply_predictor(&raw, 2, 3, 1, 8).unwrap();
        assert_eq!(out, vec![10, 15, 20]);
    }

    #[test]
    fn test_dct_passthrough() {
        let filter = PDFObject::Name("DCTDecode".into());
        let data = vec![0xff, 0xd8, 0xff, 0xe0];
        assert_eq!(apply_filters(&data, Some(&filter), None).unwrap(), data);
    }

    #[test]
    fn test_unknown_filter_is_error() {
        let filter = PDFObject::Name("BogusDecode".into());
        assert!(matches!(
            apply_filters(b"", Some(&filter), None),
            Err(PdfError::FilterError { .. })
        ));
    }
}
