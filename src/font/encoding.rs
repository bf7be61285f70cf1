//! Glyph-name resolution and the simple-font encoding database.
//!
//! Follows the Adobe Glyph List Specification:
//! https://github.com/adobe-type-tools/agl-specification#2-the-mapping

use crate::error::{PdfError, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Adobe Glyph List data embedded at compile time.
const GLYPHLIST_DATA: &str = include_str!("glyphlist.txt");

static GLYPH_TO_CHAR: LazyLock<HashMap<&'static str, char>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(512);
    for line in GLYPHLIST_DATA.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, hex)) = line.split_once(';') {
            if let Ok(code) = u32::from_str_radix(hex.trim(), 16) {
                if let Some(ch) = char::from_u32(code) {
                    map.insert(name, ch);
                }
            }
        }
    }
    map
});

/// The embedded glyph name to Unicode map.
pub fn glyphname2unicode() -> &'static HashMap<&'static str, char> {
    &GLYPH_TO_CHAR
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// UTF-16 surrogates are not valid scalar values in glyph names.
fn is_surrogate(cp: u32) -> bool {
    (0xD800..=0xDFFF).contains(&cp)
}

fn decode_component(name: &str) -> Result<String> {
    // "uni" + 4*N hex digits, each group one UTF-16 code unit.
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.len() % 4 == 0 && is_hex(hex) {
            let mut result = String::new();
            for chunk in hex.as_bytes().chunks(4) {
                let hex_str = std::str::from_utf8(chunk).unwrap();
                let cp = u32::from_str_radix(hex_str, 16)
                    .map_err(|_| PdfError::UnknownGlyph(name.to_string()))?;
                if is_surrogate(cp) {
                    return Err(PdfError::UnknownGlyph(name.to_string()));
                }
                let ch = char::from_u32(cp).ok_or(PdfError::InvalidUnicode(cp))?;
                result.push(ch);
            }
            return Ok(result);
        }
    }

    // "u" + 4 to 6 hex digits: a single code point.
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && is_hex(hex) {
            let cp = u32::from_str_radix(hex, 16)
                .map_err(|_| PdfError::UnknownGlyph(name.to_string()))?;
            if cp > 0x10FFFF || is_surrogate(cp) {
                return Err(PdfError::InvalidUnicode(cp));
            }
            let ch = char::from_u32(cp).ok_or(PdfError::InvalidUnicode(cp))?;
            return Ok(ch.to_string());
        }
    }

    if let Some(&ch) = GLYPH_TO_CHAR.get(name) {
        return Ok(ch.to_string());
    }

    Err(PdfError::UnknownGlyph(name.to_string()))
}

/// Convert an Adobe glyph name to its Unicode string.
///
/// Strips any `.suffix`, splits composite names at `_`, and resolves each
/// component via `uniXXXX` / `uXXXXXX` forms or the embedded glyph list.
pub fn name2unicode(name: &str) -> Result<String> {
    let name = match name.find('.') {
        Some(idx) => &name[..idx],
        None => name,
    };

    if name.is_empty() || name == "notdef" {
        return Err(PdfError::UnknownGlyph(name.to_string()));
    }

    let mut result = String::new();
    for part in name.split('_') {
        result.push_str(&decode_component(part)?);
    }

    Ok(result)
}

/// Entry in an Encoding `Differences` array.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// A code position
    Code(u8),
    /// A glyph name placed at the current position
    Name(String),
}

/// Standard simple-font encoding tables.
pub struct EncodingDB;

impl EncodingDB {
    /// Build a byte-to-Unicode map for the named base encoding, with an
    /// optional Differences array applied on top.
    ///
    /// Recognized names: StandardEncoding, MacRomanEncoding,
    /// WinAnsiEncoding, PDFDocEncoding. Anything else (including
    /// MacExpertEncoding) falls back to StandardEncoding. Invalid
    /// difference entries are silently ignored per the PDF spec.
    pub fn get_encoding(name: &str, differences: Option<&[DiffEntry]>) -> HashMap<u8, String> {
        use super::latin_enc::ENCODING;

        let mut encoding = HashMap::with_capacity(256);

        let col = match name {
            "StandardEncoding" => 0,
            "MacRomanEncoding" => 1,
            "WinAnsiEncoding" => 2,
            "PDFDocEncoding" => 3,
            _ => 0,
        };

        for &(glyph_name, std, mac, win, pdf) in ENCODING {
            let code = match col {
                1 => mac,
                2 => win,
                3 => pdf,
                _ => std,
            };
            if let Some(code) = code {
                if let Ok(unicode) = name2unicode(glyph_name) {
                    encoding.insert(code, unicode);
                }
            }
        }

        if let Some(diffs) = differences {
            let mut current_code: Option<u8> = None;
            for entry in diffs {
                match entry {
                    DiffEntry::Code(code) => {
                        current_code = Some(*code);
                    }
                    DiffEntry::Name(glyph_name) => {
                        if let Some(code) = current_code {
                            if let Ok(unicode) = name2unicode(glyph_name) {
                                encoding.insert(code, unicode);
                            }
                            current_code = code.checked_add(1);
                        }
                    }
                }
            }
        }

        encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_list_loaded() {
        assert!(GLYPH_TO_CHAR.len() > 250);
        assert_eq!(GLYPH_TO_CHAR.get("A"), Some(&'A'));
        assert_eq!(GLYPH_TO_CHAR.get("bullet"), Some(&'\u{2022}'));
    }

    #[test]
    fn test_name2unicode_uni_form() {
        assert_eq!(name2unicode("uni0041").unwrap(), "A");
        assert_eq!(name2unicode("uni00410042").unwrap(), "AB");
        assert_eq!(name2unicode("u1F600").unwrap(), "\u{1F600}");
        assert!(name2unicode("uniD800").is_err());
    }

    #[test]
    fn test_name2unicode_composite_and_suffix() {
        assert_eq!(name2unicode("f_i").unwrap(), "fi");
        assert_eq!(name2unicode("A.sc").unwrap(), "A");
        assert!(name2unicode("notdef").is_err());
    }

    #[test]
    fn test_winansi_positions() {
        let enc = EncodingDB::get_encoding("WinAnsiEncoding", None);
        assert_eq!(enc.get(&65).map(String::as_str), Some("A"));
        assert_eq!(enc.get(&128).map(String::as_str), Some("\u{20AC}"));
        assert_eq!(enc.get(&215).map(String::as_str), Some("\u{00D7}"));
    }

    #[test]
    fn test_differences_applied() {
        let diffs = vec![
            DiffEntry::Code(65),
            DiffEntry::Name("bullet".into()),
            DiffEntry::Name("emdash".into()),
        ];
        let enc = EncodingDB::get_encoding("StandardEncoding", Some(&diffs));
        assert_eq!(enc.get(&65).map(String::as_str), Some("\u{2022}"));
        assert_eq!(enc.get(&66).map(String::as_str), Some("\u{2014}"));
        assert_eq!(enc.get(&67).map(String::as_str), Some("C"));
    }

    #[test]
    fn test_unknown_name_ignored_in_differences() {
        let diffs = vec![DiffEntry::Code(65), DiffEntry::Name("gXYZnoSuch".into())];
        let enc = EncodingDB::get_encoding("StandardEncoding", Some(&diffs));
        // Unknown glyph leaves the base mapping in place.
        assert_eq!(enc.get(&65).map(String::as_str), Some("A"));
    }
}
